//! services/sync/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;

use schedule_core::{Role, RoleMap};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection settings for the hosted backend. All six values are supplied
/// by the backend console for one project.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

/// Holds all configuration loaded from the environment at startup.
///
/// `backend` is `None` when the API key is absent; the caller logs that and
/// runs in local-only mode instead of failing.
#[derive(Clone, Debug)]
pub struct Config {
    pub backend: Option<BackendConfig>,
    pub role_map: RoleMap,
    pub log_level: Level,
    pub poll_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Hosted Backend Settings ---
        // A missing API key disables the backend (local-only mode); the other
        // five values are only required once a key is present.
        let backend = match std::env::var("BACKEND_API_KEY") {
            Err(_) => None,
            Ok(api_key) => Some(BackendConfig {
                api_key,
                auth_domain: require_var("BACKEND_AUTH_DOMAIN")?,
                project_id: require_var("BACKEND_PROJECT_ID")?,
                storage_bucket: require_var("BACKEND_STORAGE_BUCKET")?,
                messaging_sender_id: require_var("BACKEND_MESSAGING_SENDER_ID")?,
                app_id: require_var("BACKEND_APP_ID")?,
            }),
        };

        // --- Role Mapping ---
        let role_map = match std::env::var("ROLE_MAP") {
            Err(_) => RoleMap::with_defaults(),
            Ok(raw) => parse_role_map(&raw)?,
        };

        let poll_interval_secs = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".to_string());
        let poll_interval = poll_interval_secs
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "POLL_INTERVAL_SECS".to_string(),
                    format!("'{}' is not a number of seconds", poll_interval_secs),
                )
            })?;

        Ok(Self {
            backend,
            role_map,
            log_level,
            poll_interval,
        })
    }
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

/// Parses `ROLE_MAP` entries of the form `email=role`, comma-separated.
fn parse_role_map(raw: &str) -> Result<RoleMap, ConfigError> {
    let mut map = RoleMap::empty();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let (email, role_name) = entry.split_once('=').ok_or_else(|| {
            ConfigError::InvalidValue(
                "ROLE_MAP".to_string(),
                format!("'{}' is not of the form email=role", entry.trim()),
            )
        })?;
        let role = Role::parse(role_name).ok_or_else(|| {
            ConfigError::InvalidValue(
                "ROLE_MAP".to_string(),
                format!("'{}' is not a known role", role_name.trim()),
            )
        })?;
        map.insert(email, role);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_map_parses_comma_separated_pairs() {
        let map = parse_role_map("rektor@schule.example=admin, k.weber@schule.example=teacher")
            .unwrap();
        assert_eq!(map.role_for("rektor@schule.example"), Some(Role::Admin));
        assert_eq!(map.role_for("k.weber@schule.example"), Some(Role::Teacher));
    }

    #[test]
    fn role_map_rejects_unknown_roles() {
        assert!(parse_role_map("x@example.com=principal").is_err());
        assert!(parse_role_map("not-a-pair").is_err());
    }

    #[test]
    fn empty_role_map_entries_are_skipped() {
        let map = parse_role_map("a@example.com=admin,,").unwrap();
        assert_eq!(map.role_for("a@example.com"), Some(Role::Admin));
    }
}

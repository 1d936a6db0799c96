//! crates/schedule_core/src/roles.rs
//!
//! Role derivation from authenticated identities.
//!
//! Roles are never stored durably; they are recomputed from the email on
//! every auth state change. The mapping table is configurable so that
//! changing permissions does not require a rebuild; the two well-known
//! addresses of the tool are the default entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Coarse access tier of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Guest,
}

impl Role {
    /// Parses the role names accepted in configuration.
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "guest" => Some(Role::Guest),
            _ => None,
        }
    }
}

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@schedule.example.com";
pub const DEFAULT_TEACHER_EMAIL: &str = "teacher@schedule.example.com";

/// Email → role mapping table. Lookups are case-insensitive; identities
/// without an entry are rejected by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMap {
    entries: BTreeMap<String, Role>,
}

impl Default for RoleMap {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RoleMap {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The mapping shipped with the tool: one admin, one teacher.
    pub fn with_defaults() -> Self {
        let mut map = Self::empty();
        map.insert(DEFAULT_ADMIN_EMAIL, Role::Admin);
        map.insert(DEFAULT_TEACHER_EMAIL, Role::Teacher);
        map
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Role)>,
        S: AsRef<str>,
    {
        let mut map = Self::empty();
        for (email, role) in pairs {
            map.insert(email.as_ref(), role);
        }
        map
    }

    pub fn insert(&mut self, email: &str, role: Role) {
        self.entries.insert(email.trim().to_ascii_lowercase(), role);
    }

    pub fn role_for(&self, email: &str) -> Option<Role> {
        self.entries
            .get(&email.trim().to_ascii_lowercase())
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_knows_the_two_shipped_addresses() {
        let map = RoleMap::with_defaults();
        assert_eq!(map.role_for(DEFAULT_ADMIN_EMAIL), Some(Role::Admin));
        assert_eq!(map.role_for(DEFAULT_TEACHER_EMAIL), Some(Role::Teacher));
    }

    #[test]
    fn unknown_addresses_have_no_role() {
        let map = RoleMap::with_defaults();
        assert_eq!(map.role_for("intruder@example.com"), None);
    }

    #[test]
    fn lookups_ignore_case_and_whitespace() {
        let map = RoleMap::from_pairs([("Rektor@Schule.example", Role::Admin)]);
        assert_eq!(map.role_for(" rektor@schule.example "), Some(Role::Admin));
    }

    #[test]
    fn role_names_parse_from_configuration() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" Teacher "), Some(Role::Teacher));
        assert_eq!(Role::parse("principal"), None);
    }
}

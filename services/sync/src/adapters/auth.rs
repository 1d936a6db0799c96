//! services/sync/src/adapters/auth.rs
//!
//! This module contains the identity provider adapter, the concrete
//! implementation of the `AuthService` port from the `core` crate. It talks
//! to the hosted provider's REST endpoints and pushes auth-state changes to
//! subscribers through a broadcast channel.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use schedule_core::{AuthService, AuthUser, PortError, PortResult, PortStream};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::config::BackendConfig;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// The signed-in session held by the adapter. The token never leaves this
/// module.
#[derive(Clone)]
struct SignedIn {
    user: AuthUser,
    id_token: String,
}

/// An identity provider adapter that implements the `AuthService` port.
pub struct HostedAuthAdapter {
    http: reqwest::Client,
    auth_url: String,
    api_key: String,
    current: Mutex<Option<SignedIn>>,
    events: broadcast::Sender<Option<AuthUser>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
}

impl HostedAuthAdapter {
    /// Creates a new `HostedAuthAdapter` for the configured project.
    pub fn new(backend: &BackendConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http: reqwest::Client::new(),
            auth_url: format!("https://{}/v1", backend.auth_domain),
            api_key: backend.api_key.clone(),
            current: Mutex::new(None),
            events,
        }
    }

    /// Password sign-in. On success the new identity is pushed to all
    /// auth-state subscribers.
    pub async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthUser> {
        let url = format!(
            "{}/accounts:signInWithPassword?key={}",
            self.auth_url, self.api_key
        );
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
                Err(PortError::Unauthorized)
            }
            status if status.is_success() => {
                let body: SignInResponse = response
                    .json()
                    .await
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                let user = AuthUser {
                    uid: body.local_id,
                    email: body.email,
                };
                *self
                    .current
                    .lock()
                    .expect("auth session lock poisoned") = Some(SignedIn {
                    user: user.clone(),
                    id_token: body.id_token,
                });
                let _ = self.events.send(Some(user.clone()));
                Ok(user)
            }
            status => Err(PortError::Unexpected(format!(
                "sign-in failed with status {status}"
            ))),
        }
    }

    fn snapshot(&self) -> Option<AuthUser> {
        self.current
            .lock()
            .expect("auth session lock poisoned")
            .as_ref()
            .map(|s| s.user.clone())
    }
}

#[async_trait]
impl AuthService for HostedAuthAdapter {
    /// Attaches to the provider's auth-state notifications. The current
    /// state is delivered immediately, then every change; consecutive
    /// duplicates are collapsed.
    async fn subscribe(&self) -> PortResult<PortStream<Option<AuthUser>>> {
        let mut rx = self.events.subscribe();
        let initial = self.snapshot();
        let stream = async_stream::stream! {
            let mut last = initial.clone();
            yield initial;
            loop {
                match rx.recv().await {
                    Ok(state) => {
                        if state == last {
                            continue;
                        }
                        last = state.clone();
                        yield state;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(Box::pin(stream))
    }

    /// Terminates the session server-side and notifies subscribers. A failed
    /// revocation is logged; the local session is cleared either way.
    async fn sign_out(&self) -> PortResult<()> {
        let signed_in = self
            .current
            .lock()
            .expect("auth session lock poisoned")
            .take();

        if let Some(signed_in) = signed_in {
            let url = format!("{}/accounts:signOut?key={}", self.auth_url, self.api_key);
            let result = self
                .http
                .post(&url)
                .json(&serde_json::json!({ "idToken": signed_in.id_token }))
                .send()
                .await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    warn!(status = %response.status(), "server-side sign-out failed");
                }
                Err(e) => warn!("server-side sign-out failed: {e}"),
                Ok(_) => {}
            }
        }

        let _ = self.events.send(None);
        Ok(())
    }
}

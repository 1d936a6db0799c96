//! crates/schedule_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the sync layer's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to stay independent of the concrete hosted backend.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::{AppData, AuthUser, DocumentPatch};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the
/// identity provider or the document database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A pinned, boxed stream of port items.
pub type PortStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The hosted identity provider.
///
/// `subscribe` is push-based: each item is the new auth state, `Some` for a
/// signed-in identity and `None` for none. Dropping the stream releases the
/// registration with the provider.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn subscribe(&self) -> PortResult<PortStream<Option<AuthUser>>>;

    /// Terminates the session server-side.
    async fn sign_out(&self) -> PortResult<()>;
}

/// The hosted document database holding the one logical document.
///
/// The core treats this as opaque: no caching, no diffing, no conflict
/// resolution — last writer wins. `subscribe` delivers the full document on
/// every remote change; errors (e.g. permission denial) arrive through the
/// stream and end it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn subscribe(&self) -> PortResult<PortStream<PortResult<DocumentPatch>>>;

    /// Full-document upsert.
    async fn save(&self, data: &AppData) -> PortResult<()>;
}

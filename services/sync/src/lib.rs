//! services/sync/src/lib.rs
//!
//! The runtime layer of the scheduling tool's sync service: configuration,
//! adapters for the hosted backend, and the async client that drives the
//! core's full-data context.

pub mod adapters;
pub mod client;
pub mod config;
pub mod error;

pub use client::views::{ConfigData, ConfigUpdate, ConfigView, PlanData, PlanUpdate, PlanView};
pub use client::SyncClient;
pub use config::{BackendConfig, Config, ConfigError};
pub use error::SyncError;

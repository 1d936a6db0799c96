//! services/sync/src/bin/sync.rs
//!
//! Composition root: wires configuration, the backend adapters and the sync
//! client together, then runs until interrupted.

use std::sync::Arc;

use schedule_core::{AuthService, DocumentStore};
use sync_lib::{
    adapters::{HostedAuthAdapter, MemoryAuth, MemoryStore, RestDocumentStore},
    config::Config,
    error::SyncError,
    SyncClient,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            config.log_level.to_string(),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting sync service...");

    // --- 2. Initialize the Backend Adapters ---
    // A missing API key is not fatal: the tool keeps working locally, it
    // just cannot reach the hosted backend.
    let (auth, store): (Arc<dyn AuthService>, Arc<dyn DocumentStore>) = match &config.backend {
        Some(backend) => {
            info!(project = %backend.project_id, "connecting to hosted backend");
            (
                Arc::new(HostedAuthAdapter::new(backend)),
                Arc::new(RestDocumentStore::new(backend, config.poll_interval)),
            )
        }
        None => {
            warn!("backend API key missing; running in local-only mode");
            (
                Arc::new(MemoryAuth::default()),
                Arc::new(MemoryStore::default()),
            )
        }
    };

    // --- 3. Build and Start the Client ---
    let client = SyncClient::new(auth, store, config.role_map.clone());
    client.start();
    info!("sync client started; waiting for auth state");

    // --- 4. Run Until Interrupted ---
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    client.shutdown();

    Ok(())
}

//! services/sync/src/adapters/memory.rs
//!
//! In-process implementations of both ports. Used for the degraded
//! local-only mode (no backend API key configured) and as the base for
//! test doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use schedule_core::{
    AppData, AuthService, AuthUser, DocumentPatch, DocumentStore, PortResult, PortStream,
};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// An in-process `AuthService`: auth state is set directly through
/// [`MemoryAuth::set_state`] instead of by a remote provider.
pub struct MemoryAuth {
    current: Mutex<Option<AuthUser>>,
    events: broadcast::Sender<Option<AuthUser>>,
    sign_outs: AtomicUsize,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            current: Mutex::new(None),
            events,
            sign_outs: AtomicUsize::new(0),
        }
    }
}

impl MemoryAuth {
    /// Pushes a new auth state to all subscribers.
    pub fn set_state(&self, state: Option<AuthUser>) {
        *self.current.lock().expect("auth state lock poisoned") = state.clone();
        let _ = self.events.send(state);
    }

    /// How many times `sign_out` has been invoked.
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthService for MemoryAuth {
    async fn subscribe(&self) -> PortResult<PortStream<Option<AuthUser>>> {
        let mut rx = self.events.subscribe();
        let initial = self
            .current
            .lock()
            .expect("auth state lock poisoned")
            .clone();
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

    async fn sign_out(&self) -> PortResult<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.set_state(None);
        Ok(())
    }
}

/// An in-process `DocumentStore` holding the one document in memory. Saves
/// are broadcast to all subscribers, so several handles stay consistent.
pub struct MemoryStore {
    document: Mutex<Option<AppData>>,
    events: broadcast::Sender<DocumentPatch>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            document: Mutex::new(None),
            events,
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(&self) -> PortResult<PortStream<PortResult<DocumentPatch>>> {
        let mut rx = self.events.subscribe();
        let initial = self
            .document
            .lock()
            .expect("document lock poisoned")
            .as_ref()
            .map(|d| d.to_patch())
            .unwrap_or_default();
        let stream = async_stream::stream! {
            yield Ok(initial);
            loop {
                match rx.recv().await {
                    Ok(patch) => yield Ok(patch),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn save(&self, data: &AppData) -> PortResult<()> {
        *self.document.lock().expect("document lock poisoned") = Some(data.clone());
        let _ = self.events.send(data.to_patch());
        Ok(())
    }
}

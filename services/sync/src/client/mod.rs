//! services/sync/src/client/mod.rs
//!
//! The composition of session manager, full-data context and document store:
//! one task watches the auth provider, a second follows the document
//! subscription, and user-initiated calls (save/undo/redo/reset/logout) are
//! applied to the context synchronously before any persistence is spawned.

pub mod views;

use std::sync::Arc;

use futures::StreamExt;
use schedule_core::{
    AppData, AuthService, AuthUser, DataContext, DocumentPatch, DocumentStore, Identity, NextStep,
    Role, RoleMap, SaveOutcome,
};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::adapters::{MemoryAuth, MemoryStore};

struct Inner {
    ctx: Mutex<DataContext>,
    auth: Arc<dyn AuthService>,
    store: Arc<dyn DocumentStore>,
    role_map: RoleMap,
    loading_tx: watch::Sender<bool>,
    cancel: CancellationToken,
    /// Token of the currently running document subscription, if any.
    doc_task: Mutex<Option<CancellationToken>>,
}

/// Handle to the sync layer. Cheap to clone; all clones share one context.
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<Inner>,
}

impl SyncClient {
    /// A client that waits for the auth provider before touching the store.
    /// Call [`SyncClient::start`] to attach the auth watcher.
    pub fn new(
        auth: Arc<dyn AuthService>,
        store: Arc<dyn DocumentStore>,
        role_map: RoleMap,
    ) -> Self {
        let (loading_tx, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                ctx: Mutex::new(DataContext::new()),
                auth,
                store,
                role_map,
                loading_tx,
                cancel: CancellationToken::new(),
                doc_task: Mutex::new(None),
            }),
        }
    }

    /// A read-only client seeded with exactly the given snapshot. No remote
    /// loading, no persistence; used for public views.
    pub fn read_only(snapshot: AppData) -> Self {
        let (loading_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                ctx: Mutex::new(DataContext::with_snapshot(snapshot)),
                auth: Arc::new(MemoryAuth::default()),
                store: Arc::new(MemoryStore::default()),
                role_map: RoleMap::empty(),
                loading_tx,
                cancel: CancellationToken::new(),
                doc_task: Mutex::new(None),
            }),
        }
    }

    /// Attaches to the auth provider's state-change notifications.
    pub fn start(&self) {
        let client = self.clone();
        tokio::spawn(async move { client.run_auth_watcher().await });
    }

    /// Cancels every running task. Subscriptions end, nothing mutates the
    /// context afterwards.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    //=====================================================================================
    // Auth watching
    //=====================================================================================

    async fn run_auth_watcher(&self) {
        let mut stream = match self.inner.auth.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("auth subscription failed: {e}");
                self.resolve_identity(Identity::Absent).await;
                return;
            }
        };
        loop {
            tokio::select! {
                _ = self.inner.cancel.cancelled() => break,
                state = stream.next() => {
                    let Some(state) = state else { break };
                    self.on_auth_state(state).await;
                }
            }
        }
    }

    /// Applies one auth-state notification: derive the role, reject
    /// unrecognized identities (server-side sign-out), and restart the
    /// document subscription for the new identity.
    async fn on_auth_state(&self, state: Option<AuthUser>) {
        let identity = match state {
            None => {
                // A signed-out notification does not displace an explicit
                // guest; guest status is purely local.
                if matches!(*self.inner.ctx.lock().await.identity(), Identity::Guest) {
                    return;
                }
                Identity::Absent
            }
            Some(user) => match self.inner.role_map.role_for(&user.email) {
                Some(Role::Guest) => Identity::Guest,
                Some(role) => {
                    info!(email = %user.email, ?role, "identity recognized");
                    Identity::User {
                        email: user.email,
                        role,
                    }
                }
                None => {
                    // Authenticated but unknown: rejected, not merely
                    // unprivileged.
                    warn!(email = %user.email, "unrecognized identity; terminating session");
                    if let Err(e) = self.inner.auth.sign_out().await {
                        error!("sign-out of unrecognized identity failed: {e}");
                    }
                    Identity::Absent
                }
            },
        };
        // An identity switch must never leave a stale subscription running.
        self.cancel_doc_subscription().await;
        self.resolve_identity(identity).await;
    }

    async fn resolve_identity(&self, identity: Identity) {
        let step = {
            let mut ctx = self.inner.ctx.lock().await;
            let step = ctx.identity_resolved(identity);
            self.inner.loading_tx.send_replace(ctx.loading());
            step
        };
        if step == NextStep::Subscribe {
            self.spawn_doc_subscription().await;
        }
    }

    //=====================================================================================
    // Document subscription
    //=====================================================================================

    async fn spawn_doc_subscription(&self) {
        let token = self.inner.cancel.child_token();
        *self.inner.doc_task.lock().await = Some(token.clone());
        let client = self.clone();
        tokio::spawn(async move { client.run_doc_subscription(token).await });
    }

    async fn cancel_doc_subscription(&self) {
        if let Some(token) = self.inner.doc_task.lock().await.take() {
            token.cancel();
        }
    }

    async fn run_doc_subscription(&self, token: CancellationToken) {
        let mut stream = match self.inner.store.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("document subscription failed: {e}");
                self.fail_subscription().await;
                return;
            }
        };
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                item = stream.next() => match item {
                    Some(Ok(patch)) => {
                        let mut ctx = self.inner.ctx.lock().await;
                        ctx.apply_remote(&patch);
                        self.inner.loading_tx.send_replace(ctx.loading());
                    }
                    Some(Err(e)) => {
                        error!("document subscription failed: {e}");
                        self.fail_subscription().await;
                        break;
                    }
                    None => break,
                },
            }
        }
    }

    async fn fail_subscription(&self) {
        let mut ctx = self.inner.ctx.lock().await;
        ctx.subscription_failed();
        self.inner.loading_tx.send_replace(ctx.loading());
    }

    //=====================================================================================
    // Session control
    //=====================================================================================

    /// Enters the explicit, purely local guest role (no authentication).
    pub async fn enter_guest(&self) {
        self.cancel_doc_subscription().await;
        self.resolve_identity(Identity::Guest).await;
    }

    /// Clears the role and terminates the session regardless of which role
    /// is active.
    pub async fn logout(&self) {
        self.cancel_doc_subscription().await;
        if let Err(e) = self.inner.auth.sign_out().await {
            error!("sign-out failed: {e}");
        }
        self.resolve_identity(Identity::Absent).await;
    }

    //=====================================================================================
    // Write path
    //=====================================================================================

    /// Merges the patch into the current data and applies it immediately;
    /// when the context requests it, the snapshot is persisted in the
    /// background (failures logged, never rolled back).
    pub async fn save_data(&self, patch: &DocumentPatch, add_to_history: bool) -> SaveOutcome {
        let outcome = self.inner.ctx.lock().await.save_data(patch, add_to_history);
        self.persist_if_requested(&outcome);
        outcome
    }

    pub async fn undo(&self) -> Option<SaveOutcome> {
        let outcome = self.inner.ctx.lock().await.undo();
        if let Some(outcome) = &outcome {
            self.persist_if_requested(outcome);
        }
        outcome
    }

    pub async fn redo(&self) -> Option<SaveOutcome> {
        let outcome = self.inner.ctx.lock().await.redo();
        if let Some(outcome) = &outcome {
            self.persist_if_requested(outcome);
        }
        outcome
    }

    /// Saves the static default document through the normal write path.
    pub async fn reset(&self) -> SaveOutcome {
        let outcome = self.inner.ctx.lock().await.reset();
        self.persist_if_requested(&outcome);
        outcome
    }

    fn persist_if_requested(&self, outcome: &SaveOutcome) {
        if let SaveOutcome::Persist(snapshot) = outcome {
            let store = Arc::clone(&self.inner.store);
            let snapshot = snapshot.clone();
            tokio::spawn(async move {
                if let Err(e) = store.save(&snapshot).await {
                    error!("failed to persist document: {e}");
                }
            });
        }
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub async fn data(&self) -> AppData {
        self.inner.ctx.lock().await.data().clone()
    }

    /// The derived role of the current session, if any.
    pub async fn role(&self) -> Option<Role> {
        match self.inner.ctx.lock().await.identity() {
            Identity::User { role, .. } => Some(*role),
            Identity::Guest => Some(Role::Guest),
            Identity::Unresolved | Identity::Absent => None,
        }
    }

    pub async fn can_undo(&self) -> bool {
        self.inner.ctx.lock().await.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.inner.ctx.lock().await.can_redo()
    }

    /// Watch channel mirroring the context's loading flag.
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryAuth, MemoryStore};
    use async_trait::async_trait;
    use schedule_core::{
        LocalOnlyReason, PortError, PortResult, PortStream, Settings, SettingsPatch,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Wraps the memory store and counts upserts.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        saves: AtomicUsize,
    }

    impl CountingStore {
        fn save_count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn subscribe(&self) -> PortResult<PortStream<PortResult<DocumentPatch>>> {
            self.inner.subscribe().await
        }

        async fn save(&self, data: &AppData) -> PortResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(data).await
        }
    }

    /// A store whose subscription dies immediately, e.g. permission denial.
    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn subscribe(&self) -> PortResult<PortStream<PortResult<DocumentPatch>>> {
            let stream = async_stream::stream! {
                yield Err(PortError::Unauthorized);
            };
            Ok(Box::pin(stream))
        }

        async fn save(&self, _data: &AppData) -> PortResult<()> {
            Err(PortError::Unauthorized)
        }
    }

    fn admin_user() -> AuthUser {
        AuthUser {
            uid: "uid-admin".to_string(),
            email: schedule_core::DEFAULT_ADMIN_EMAIL.to_string(),
        }
    }

    fn name_patch(name: &str) -> DocumentPatch {
        DocumentPatch {
            settings: Some(SettingsPatch {
                school_name: Some(name.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if check().await {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn recognized_email_gets_its_role_and_loads() {
        let auth = Arc::new(MemoryAuth::default());
        let store = Arc::new(MemoryStore::default());
        let client = SyncClient::new(auth.clone(), store, RoleMap::with_defaults());
        client.start();

        auth.set_state(Some(admin_user()));

        let c = client.clone();
        eventually(|| {
            let c = c.clone();
            async move { c.role().await == Some(Role::Admin) }
        })
        .await;

        let c = client.clone();
        eventually(|| {
            let c = c.clone();
            async move { !*c.loading().borrow() }
        })
        .await;
        assert_eq!(auth.sign_out_count(), 0);
    }

    #[tokio::test]
    async fn unrecognized_identity_is_signed_out_exactly_once() {
        let auth = Arc::new(MemoryAuth::default());
        let store = Arc::new(CountingStore::default());
        let client = SyncClient::new(auth.clone(), store, RoleMap::with_defaults());
        client.start();

        auth.set_state(Some(AuthUser {
            uid: "uid-stranger".to_string(),
            email: "stranger@example.com".to_string(),
        }));

        let a = auth.clone();
        eventually(|| {
            let a = a.clone();
            async move { a.sign_out_count() == 1 }
        })
        .await;

        // Give the follow-up signed-out notification time to settle; it must
        // not trigger a second termination.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(auth.sign_out_count(), 1);
        assert_eq!(client.role().await, None);
    }

    #[tokio::test]
    async fn guest_write_never_reaches_the_store() {
        let auth = Arc::new(MemoryAuth::default());
        let store = Arc::new(CountingStore::default());
        let client = SyncClient::new(auth.clone(), store.clone(), RoleMap::with_defaults());
        client.start();
        client.enter_guest().await;

        let outcome = client.save_data(&name_patch("guest edit"), true).await;
        assert_eq!(outcome, SaveOutcome::LocalOnly(LocalOnlyReason::Guest));
        assert_eq!(client.data().await.settings.school_name, "guest edit");

        // Let any wrongly spawned persistence task run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn admin_save_persists_in_the_background() {
        let auth = Arc::new(MemoryAuth::default());
        let store = Arc::new(CountingStore::default());
        let client = SyncClient::new(auth.clone(), store.clone(), RoleMap::with_defaults());
        client.start();

        auth.set_state(Some(admin_user()));
        let c = client.clone();
        eventually(|| {
            let c = c.clone();
            async move { c.role().await == Some(Role::Admin) && !*c.loading().borrow() }
        })
        .await;

        let outcome = client.save_data(&name_patch("persisted"), true).await;
        assert!(matches!(outcome, SaveOutcome::Persist(_)));

        let s = store.clone();
        eventually(|| {
            let s = s.clone();
            async move { s.save_count() == 1 }
        })
        .await;
    }

    #[tokio::test]
    async fn remote_updates_do_not_reset_local_history() {
        let auth = Arc::new(MemoryAuth::default());
        let store = Arc::new(MemoryStore::default());
        let client = SyncClient::new(auth.clone(), store.clone(), RoleMap::with_defaults());
        client.start();

        auth.set_state(Some(admin_user()));
        let c = client.clone();
        eventually(|| {
            let c = c.clone();
            async move { c.role().await == Some(Role::Admin) && !*c.loading().borrow() }
        })
        .await;

        client.save_data(&name_patch("first"), true).await;
        client.save_data(&name_patch("second"), true).await;

        // An external writer pushes a new document.
        let external = AppData {
            settings: Settings {
                school_name: "external".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        store.save(&external).await.unwrap();

        let c = client.clone();
        eventually(|| {
            let c = c.clone();
            async move { c.data().await.settings.school_name == "external" }
        })
        .await;
        assert!(client.can_undo().await);
    }

    #[tokio::test]
    async fn subscription_error_falls_back_to_defaults() {
        let auth = Arc::new(MemoryAuth::default());
        let client = SyncClient::new(auth.clone(), Arc::new(FailingStore), RoleMap::with_defaults());
        client.start();

        auth.set_state(Some(admin_user()));

        // The failing subscription clears loading and leaves the defaults.
        let c = client.clone();
        eventually(|| {
            let c = c.clone();
            async move { c.role().await == Some(Role::Admin) && !*c.loading().borrow() }
        })
        .await;
        assert_eq!(client.data().await, AppData::initial());
    }

    #[tokio::test]
    async fn logout_terminates_the_session_and_clears_state() {
        let auth = Arc::new(MemoryAuth::default());
        let store = Arc::new(MemoryStore::default());
        let client = SyncClient::new(auth.clone(), store, RoleMap::with_defaults());
        client.start();

        auth.set_state(Some(admin_user()));
        let c = client.clone();
        eventually(|| {
            let c = c.clone();
            async move { c.role().await == Some(Role::Admin) }
        })
        .await;

        client.save_data(&name_patch("before logout"), true).await;
        client.logout().await;

        assert_eq!(auth.sign_out_count(), 1);
        assert_eq!(client.role().await, None);
        assert_eq!(client.data().await, AppData::initial());
        assert!(!client.can_undo().await);
    }

    #[tokio::test]
    async fn read_only_client_serves_its_snapshot_and_rejects_persistence() {
        let snapshot = AppData {
            settings: Settings {
                school_name: "public".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let client = SyncClient::read_only(snapshot.clone());

        assert_eq!(client.data().await, snapshot);
        assert!(!*client.loading().borrow());

        let outcome = client.save_data(&name_patch("edit"), true).await;
        assert_eq!(outcome, SaveOutcome::LocalOnly(LocalOnlyReason::ReadOnly));
    }
}

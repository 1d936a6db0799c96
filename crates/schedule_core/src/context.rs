//! crates/schedule_core/src/context.rs
//!
//! The full-data context: owns the current document and its undo/redo
//! history, gates writes by role, and tells the driver which side effects
//! (subscribe, persist) to perform. All methods are synchronous; the async
//! driver in the service layer sequences them and runs the effects.

use tracing::warn;

use crate::domain::{AppData, DocumentPatch};
use crate::history::History;
use crate::roles::Role;

/// The resolved identity driving this context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The auth provider has not reported yet.
    Unresolved,
    /// Resolved: nobody signed in, no guest.
    Absent,
    /// Explicit local guest, mutually exclusive with derived roles.
    Guest,
    /// A recognized signed-in identity.
    User { email: String, role: Role },
}

/// What the driver should do after an identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Subscribe to the document store.
    Subscribe,
    /// Nothing to start; the context settled locally.
    Idle,
}

/// Why a write stayed local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOnlyReason {
    /// This context is an explicit read-only snapshot consumer.
    ReadOnly,
    /// Guest writers are rejected before any persistence attempt.
    Guest,
    /// Neither a user nor a guest is present.
    SignedOut,
}

/// Result of a write. The optimistic local update has already been applied
/// either way; `Persist` carries the snapshot the driver should upsert
/// remotely (fire-and-forget, failures logged and never rolled back).
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Persist(AppData),
    LocalOnly(LocalOnlyReason),
}

pub struct DataContext {
    data: AppData,
    history: History,
    identity: Identity,
    read_only: bool,
    loading: bool,
}

impl Default for DataContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DataContext {
    /// A context that waits for identity resolution before any remote work.
    pub fn new() -> Self {
        Self {
            data: AppData::initial(),
            history: History::new(),
            identity: Identity::Unresolved,
            read_only: false,
            loading: true,
        }
    }

    /// A read-only context seeded with exactly the given snapshot; remote
    /// loading is skipped entirely.
    pub fn with_snapshot(snapshot: AppData) -> Self {
        let mut history = History::new();
        history.seed(snapshot.clone());
        Self {
            data: snapshot,
            history,
            identity: Identity::Absent,
            read_only: true,
            loading: false,
        }
    }

    //=====================================================================================
    // Identity and remote transitions
    //=====================================================================================

    /// Applies a resolved identity and reports whether the driver should
    /// (re)subscribe to the document store.
    pub fn identity_resolved(&mut self, identity: Identity) -> NextStep {
        if self.read_only {
            return NextStep::Idle;
        }
        self.identity = identity;
        match &self.identity {
            Identity::Unresolved => NextStep::Idle,
            Identity::Absent => {
                // No remote access is attempted; the previous session's data
                // and history must not leak into the next one.
                self.data = AppData::initial();
                self.history.clear();
                self.loading = false;
                NextStep::Idle
            }
            Identity::Guest | Identity::User { .. } => {
                self.loading = true;
                NextStep::Subscribe
            }
        }
    }

    /// Handles one remote document delivery: merge into defaults, replace
    /// the current data wholesale, and seed history only on the very first
    /// snapshot so later remote pushes never reset local undo/redo.
    pub fn apply_remote(&mut self, patch: &DocumentPatch) {
        let merged = AppData::from_remote(patch);
        if self.history.is_empty() {
            self.history.seed(merged.clone());
        }
        self.data = merged;
        self.loading = false;
    }

    /// The subscription died; fall back to the static defaults and stop
    /// loading. The caller is responsible for logging the error.
    pub fn subscription_failed(&mut self) {
        self.data = AppData::initial();
        self.loading = false;
    }

    //=====================================================================================
    // Write path
    //=====================================================================================

    /// Merges the patch into the current data, applies it immediately
    /// (optimistic), appends to history unless suppressed, and decides
    /// whether the driver should persist.
    pub fn save_data(&mut self, patch: &DocumentPatch, add_to_history: bool) -> SaveOutcome {
        let merged = self.data.merged(patch);
        self.data = merged.clone();
        if add_to_history {
            self.history.push(merged.clone());
        }
        match self.persistence_gate() {
            None => SaveOutcome::Persist(merged),
            Some(reason) => {
                if reason == LocalOnlyReason::Guest {
                    warn!("guest session: change applied locally, not persisted");
                }
                SaveOutcome::LocalOnly(reason)
            }
        }
    }

    /// Steps back one history entry and applies it. The applied snapshot is
    /// itself persisted when a user is present, so undo propagates to the
    /// backend. `None` when already at the start.
    pub fn undo(&mut self) -> Option<SaveOutcome> {
        let snapshot = self.history.undo()?.clone();
        self.data = snapshot.clone();
        Some(self.outcome_for(snapshot))
    }

    /// Counterpart of [`Self::undo`]; `None` when already at the tail.
    pub fn redo(&mut self) -> Option<SaveOutcome> {
        let snapshot = self.history.redo()?.clone();
        self.data = snapshot.clone();
        Some(self.outcome_for(snapshot))
    }

    /// A save of the static default document through the normal write path,
    /// including persistence and guest rejection.
    pub fn reset(&mut self) -> SaveOutcome {
        self.save_data(&AppData::initial().to_patch(), true)
    }

    /// `Some(reason)` when writes must stay local.
    fn persistence_gate(&self) -> Option<LocalOnlyReason> {
        if self.read_only {
            Some(LocalOnlyReason::ReadOnly)
        } else {
            match self.identity {
                Identity::User { .. } => None,
                Identity::Guest => Some(LocalOnlyReason::Guest),
                Identity::Unresolved | Identity::Absent => Some(LocalOnlyReason::SignedOut),
            }
        }
    }

    fn outcome_for(&self, snapshot: AppData) -> SaveOutcome {
        match self.persistence_gate() {
            None => SaveOutcome::Persist(snapshot),
            Some(reason) => SaveOutcome::LocalOnly(reason),
        }
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_pointer(&self) -> isize {
        self.history.pointer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Settings, SettingsPatch};
    use crate::history::HISTORY_LIMIT;
    use crate::roles::Role;

    fn user() -> Identity {
        Identity::User {
            email: "admin@schedule.example.com".to_string(),
            role: Role::Admin,
        }
    }

    fn name_patch(tag: usize) -> DocumentPatch {
        DocumentPatch {
            settings: Some(SettingsPatch {
                school_name: Some(format!("save-{tag}")),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn waits_until_identity_resolves() {
        let mut ctx = DataContext::new();
        assert!(ctx.loading());
        assert_eq!(ctx.identity_resolved(Identity::Unresolved), NextStep::Idle);
        assert!(ctx.loading());
    }

    #[test]
    fn absent_identity_falls_back_to_defaults_without_remote_access() {
        let mut ctx = DataContext::new();
        assert_eq!(ctx.identity_resolved(Identity::Absent), NextStep::Idle);
        assert!(!ctx.loading());
        assert_eq!(*ctx.data(), AppData::initial());
    }

    #[test]
    fn user_and_guest_identities_trigger_subscription() {
        let mut ctx = DataContext::new();
        assert_eq!(ctx.identity_resolved(user()), NextStep::Subscribe);
        let mut ctx = DataContext::new();
        assert_eq!(ctx.identity_resolved(Identity::Guest), NextStep::Subscribe);
    }

    #[test]
    fn snapshot_context_skips_loading_and_seeds_history() {
        let snapshot = AppData {
            settings: Settings {
                school_name: "public view".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let ctx = DataContext::with_snapshot(snapshot.clone());
        assert!(!ctx.loading());
        assert_eq!(ctx.history_len(), 1);
        assert_eq!(*ctx.data(), snapshot);
    }

    #[test]
    fn first_remote_document_seeds_history_later_ones_do_not() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());

        ctx.apply_remote(&name_patch(0));
        assert_eq!(ctx.history_len(), 1);
        assert!(!ctx.loading());

        // Build up some local history, then let a remote push arrive.
        ctx.save_data(&name_patch(1), true);
        ctx.save_data(&name_patch(2), true);
        let len_before = ctx.history_len();
        ctx.apply_remote(&name_patch(3));

        assert_eq!(ctx.history_len(), len_before);
        assert_eq!(ctx.data().settings.school_name, "save-3");
        assert!(ctx.can_undo());
    }

    #[test]
    fn save_applies_optimistically_and_requests_persist_for_users() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());

        let outcome = ctx.save_data(&name_patch(7), true);
        assert_eq!(ctx.data().settings.school_name, "save-7");
        match outcome {
            SaveOutcome::Persist(snapshot) => {
                assert_eq!(snapshot.settings.school_name, "save-7")
            }
            other => panic!("expected persist, got {other:?}"),
        }
    }

    #[test]
    fn guest_writes_apply_locally_but_never_persist() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(Identity::Guest);

        let outcome = ctx.save_data(&name_patch(1), true);
        assert_eq!(outcome, SaveOutcome::LocalOnly(LocalOnlyReason::Guest));
        assert_eq!(ctx.data().settings.school_name, "save-1");
    }

    #[test]
    fn read_only_writes_stay_local() {
        let mut ctx = DataContext::with_snapshot(AppData::initial());
        let outcome = ctx.save_data(&name_patch(1), true);
        assert_eq!(outcome, SaveOutcome::LocalOnly(LocalOnlyReason::ReadOnly));
    }

    #[test]
    fn unresolved_writes_stay_local() {
        let mut ctx = DataContext::new();
        let outcome = ctx.save_data(&name_patch(1), true);
        assert_eq!(outcome, SaveOutcome::LocalOnly(LocalOnlyReason::SignedOut));
    }

    #[test]
    fn history_invariants_hold_across_many_saves() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());
        for i in 0..(HISTORY_LIMIT + 20) {
            ctx.save_data(&name_patch(i), true);
            assert!(ctx.history_len() <= HISTORY_LIMIT);
            assert_eq!(ctx.history_pointer(), ctx.history_len() as isize - 1);
        }
        assert_eq!(ctx.history_len(), HISTORY_LIMIT);
    }

    #[test]
    fn untracked_saves_leave_history_alone() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());
        ctx.save_data(&name_patch(0), true);

        ctx.save_data(&name_patch(1), false);
        assert_eq!(ctx.history_len(), 1);
        assert_eq!(ctx.data().settings.school_name, "save-1");
    }

    #[test]
    fn undo_redo_round_trip_restores_data_and_persists() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());
        ctx.save_data(&name_patch(0), true);
        ctx.save_data(&name_patch(1), true);

        let before = ctx.data().clone();
        match ctx.undo() {
            Some(SaveOutcome::Persist(snapshot)) => {
                assert_eq!(snapshot.settings.school_name, "save-0")
            }
            other => panic!("expected persisted undo, got {other:?}"),
        }
        assert_eq!(ctx.data().settings.school_name, "save-0");

        ctx.redo().unwrap();
        assert_eq!(*ctx.data(), before);
    }

    #[test]
    fn undo_without_user_stays_local() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(Identity::Guest);
        ctx.save_data(&name_patch(0), true);
        ctx.save_data(&name_patch(1), true);

        assert_eq!(
            ctx.undo(),
            Some(SaveOutcome::LocalOnly(LocalOnlyReason::Guest))
        );
    }

    #[test]
    fn undo_at_history_start_is_a_no_op() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());
        ctx.save_data(&name_patch(0), true);
        assert!(ctx.undo().is_none());
        assert!(ctx.redo().is_none());
    }

    #[test]
    fn reset_goes_through_the_write_path() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());
        ctx.save_data(&name_patch(0), true);

        match ctx.reset() {
            SaveOutcome::Persist(snapshot) => assert_eq!(snapshot, AppData::initial()),
            other => panic!("expected persist, got {other:?}"),
        }
        assert_eq!(*ctx.data(), AppData::initial());
        // The reset itself is undoable.
        assert!(ctx.can_undo());
    }

    #[test]
    fn logout_clears_data_and_history() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());
        ctx.apply_remote(&name_patch(0));
        ctx.save_data(&name_patch(1), true);

        ctx.identity_resolved(Identity::Absent);
        assert_eq!(*ctx.data(), AppData::initial());
        assert!(!ctx.can_undo());
        assert_eq!(ctx.history_len(), 0);
    }

    #[test]
    fn subscription_failure_falls_back_to_defaults() {
        let mut ctx = DataContext::new();
        ctx.identity_resolved(user());
        assert!(ctx.loading());

        ctx.subscription_failed();
        assert!(!ctx.loading());
        assert_eq!(*ctx.data(), AppData::initial());
    }
}

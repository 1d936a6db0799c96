//! services/sync/src/client/views.rs
//!
//! Narrowing views over the full-data client: one for the configuration-like
//! subset, one for the schedule/substitution subset. Pure derived slices —
//! saves forward to the full write path, and loading/undo/redo/reset are
//! re-exposed unchanged. No independent state.

use schedule_core::{
    BellSchedule, DocumentPatch, Room, SaveOutcome, SchoolClass, ScheduleEntry, Settings,
    SettingsPatch, Subject, Substitution, Teacher,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::SyncClient;

//=========================================================================================
// Configuration subset
//=========================================================================================

/// The configuration-like slice of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigData {
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub classes: Vec<SchoolClass>,
    pub rooms: Vec<Room>,
    pub bell_schedule: BellSchedule,
    pub settings: Settings,
}

/// A partial update of the configuration slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<Subject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teachers: Option<Vec<Teacher>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<SchoolClass>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<Vec<Room>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bell_schedule: Option<BellSchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsPatch>,
}

impl From<ConfigUpdate> for DocumentPatch {
    fn from(update: ConfigUpdate) -> Self {
        DocumentPatch {
            subjects: update.subjects,
            teachers: update.teachers,
            classes: update.classes,
            rooms: update.rooms,
            bell_schedule: update.bell_schedule,
            settings: update.settings,
            ..Default::default()
        }
    }
}

/// Read/write access to the configuration subset.
#[derive(Clone)]
pub struct ConfigView {
    client: SyncClient,
}

impl ConfigView {
    pub fn new(client: SyncClient) -> Self {
        Self { client }
    }

    pub async fn data(&self) -> ConfigData {
        let data = self.client.data().await;
        ConfigData {
            subjects: data.subjects,
            teachers: data.teachers,
            classes: data.classes,
            rooms: data.rooms,
            bell_schedule: data.bell_schedule,
            settings: data.settings,
        }
    }

    pub async fn save(&self, update: ConfigUpdate, add_to_history: bool) -> SaveOutcome {
        self.client.save_data(&update.into(), add_to_history).await
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.client.loading()
    }

    pub async fn undo(&self) -> Option<SaveOutcome> {
        self.client.undo().await
    }

    pub async fn redo(&self) -> Option<SaveOutcome> {
        self.client.redo().await
    }

    pub async fn reset(&self) -> SaveOutcome {
        self.client.reset().await
    }
}

//=========================================================================================
// Schedule/substitution subset
//=========================================================================================

/// The schedule/substitution slice of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanData {
    pub schedule: Vec<ScheduleEntry>,
    pub substitutions: Vec<Substitution>,
}

/// A partial update of the schedule/substitution slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<ScheduleEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitutions: Option<Vec<Substitution>>,
}

impl From<PlanUpdate> for DocumentPatch {
    fn from(update: PlanUpdate) -> Self {
        DocumentPatch {
            schedule: update.schedule,
            substitutions: update.substitutions,
            ..Default::default()
        }
    }
}

/// Read/write access to the schedule/substitution subset.
#[derive(Clone)]
pub struct PlanView {
    client: SyncClient,
}

impl PlanView {
    pub fn new(client: SyncClient) -> Self {
        Self { client }
    }

    pub async fn data(&self) -> PlanData {
        let data = self.client.data().await;
        PlanData {
            schedule: data.schedule,
            substitutions: data.substitutions,
        }
    }

    pub async fn save(&self, update: PlanUpdate, add_to_history: bool) -> SaveOutcome {
        self.client.save_data(&update.into(), add_to_history).await
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.client.loading()
    }

    pub async fn undo(&self) -> Option<SaveOutcome> {
        self.client.undo().await
    }

    pub async fn redo(&self) -> Option<SaveOutcome> {
        self.client.redo().await
    }

    pub async fn reset(&self) -> SaveOutcome {
        self.client.reset().await
    }
}

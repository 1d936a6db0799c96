//! crates/schedule_core/src/domain.rs
//!
//! Defines the synchronized application document and its merge rules.
//! These structs are independent of any particular hosted backend; the
//! document is exchanged as camelCase JSON.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The shift slots a teacher can be scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
}

impl Shift {
    /// Every shift slot. Used when a loaded teacher record carries none.
    pub fn all() -> BTreeSet<Shift> {
        [Shift::Morning, Shift::Afternoon].into_iter().collect()
    }
}

/// School days the weekly schedule spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub short_name: String,
}

/// A teacher record. `shifts` must end up non-empty after normalization and
/// `notification_channel` identifies the messaging channel used for
/// substitution notices; both are defaulted on load when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub shifts: BTreeSet<Shift>,
    #[serde(default)]
    pub notification_channel: String,
}

impl Teacher {
    /// Fills in the defaulted fields of a loaded record.
    pub fn normalized(mut self) -> Self {
        if self.shifts.is_empty() {
            self.shifts = Shift::all();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub name: String,
}

/// One recurring lesson in the weekly schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub room_id: Option<Uuid>,
    pub day: SchoolDay,
    pub period: u8,
}

/// A dated override of the weekly schedule. A missing substitute means the
/// lesson is cancelled for that date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Substitution {
    pub id: Uuid,
    pub date: NaiveDate,
    pub period: u8,
    pub class_id: Uuid,
    pub original_teacher_id: Option<Uuid>,
    pub substitute_teacher_id: Option<Uuid>,
    #[serde(default)]
    pub note: String,
}

/// Start and end of one bell period, as "HH:MM" wall-clock strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BellPeriod {
    pub period: u8,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BellSchedule {
    #[serde(default)]
    pub periods: Vec<BellPeriod>,
}

impl Default for BellSchedule {
    fn default() -> Self {
        let times = [
            ("07:45", "08:30"),
            ("08:35", "09:20"),
            ("09:40", "10:25"),
            ("10:30", "11:15"),
            ("11:35", "12:20"),
            ("12:25", "13:10"),
        ];
        Self {
            periods: times
                .iter()
                .enumerate()
                .map(|(i, (start, end))| BellPeriod {
                    period: i as u8 + 1,
                    start: (*start).to_string(),
                    end: (*end).to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub school_name: String,
    pub school_year: String,
    pub periods_per_day: u8,
    pub substitution_visible_days: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            school_name: String::new(),
            school_year: String::new(),
            periods_per_day: 6,
            substitution_visible_days: 14,
        }
    }
}

impl Settings {
    /// Field-wise merge: fields the patch leaves unset keep their current value.
    pub fn merged(&self, patch: &SettingsPatch) -> Settings {
        Settings {
            school_name: patch
                .school_name
                .clone()
                .unwrap_or_else(|| self.school_name.clone()),
            school_year: patch
                .school_year
                .clone()
                .unwrap_or_else(|| self.school_year.clone()),
            periods_per_day: patch.periods_per_day.unwrap_or(self.periods_per_day),
            substitution_visible_days: patch
                .substitution_visible_days
                .unwrap_or(self.substitution_visible_days),
        }
    }
}

/// A partial `Settings`, used inside [`DocumentPatch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods_per_day: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitution_visible_days: Option<u8>,
}

/// The one synchronized document: the entire admin tool state.
///
/// Invariant: every top-level collection is always present. Remote documents
/// with missing fields are repaired by [`AppData::merged`] before use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppData {
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub classes: Vec<SchoolClass>,
    pub rooms: Vec<Room>,
    pub schedule: Vec<ScheduleEntry>,
    pub substitutions: Vec<Substitution>,
    pub bell_schedule: BellSchedule,
    pub settings: Settings,
}

impl AppData {
    /// The static default document seeded at process start.
    pub fn initial() -> Self {
        Self::default()
    }

    /// Produces a brand-new document with the patch layered over `self`.
    ///
    /// Collections the patch provides replace the current ones wholesale
    /// (teacher records are normalized on the way in); `settings` merges
    /// field-wise. The document is never mutated in place.
    pub fn merged(&self, patch: &DocumentPatch) -> AppData {
        AppData {
            subjects: patch
                .subjects
                .clone()
                .unwrap_or_else(|| self.subjects.clone()),
            teachers: patch
                .teachers
                .clone()
                .map(|teachers| teachers.into_iter().map(Teacher::normalized).collect())
                .unwrap_or_else(|| self.teachers.clone()),
            classes: patch
                .classes
                .clone()
                .unwrap_or_else(|| self.classes.clone()),
            rooms: patch.rooms.clone().unwrap_or_else(|| self.rooms.clone()),
            schedule: patch
                .schedule
                .clone()
                .unwrap_or_else(|| self.schedule.clone()),
            substitutions: patch
                .substitutions
                .clone()
                .unwrap_or_else(|| self.substitutions.clone()),
            bell_schedule: patch
                .bell_schedule
                .clone()
                .unwrap_or_else(|| self.bell_schedule.clone()),
            settings: patch
                .settings
                .as_ref()
                .map(|p| self.settings.merged(p))
                .unwrap_or_else(|| self.settings.clone()),
        }
    }

    /// Interprets a remote document as a patch over the static defaults, so
    /// missing collections come back as empty (or default) containers.
    pub fn from_remote(patch: &DocumentPatch) -> AppData {
        AppData::initial().merged(patch)
    }

    /// The full document expressed as a patch, for saves that replace
    /// everything (e.g. reset).
    pub fn to_patch(&self) -> DocumentPatch {
        DocumentPatch {
            subjects: Some(self.subjects.clone()),
            teachers: Some(self.teachers.clone()),
            classes: Some(self.classes.clone()),
            rooms: Some(self.rooms.clone()),
            schedule: Some(self.schedule.clone()),
            substitutions: Some(self.substitutions.clone()),
            bell_schedule: Some(self.bell_schedule.clone()),
            settings: Some(SettingsPatch {
                school_name: Some(self.settings.school_name.clone()),
                school_year: Some(self.settings.school_year.clone()),
                periods_per_day: Some(self.settings.periods_per_day),
                substitution_visible_days: Some(self.settings.substitution_visible_days),
            }),
        }
    }
}

/// A partial [`AppData`]. Both remote documents and local save payloads are
/// patches; unset fields mean "leave as is" (or "use the default" when
/// merging a remote document into the static defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<Subject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teachers: Option<Vec<Teacher>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<SchoolClass>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<Vec<Room>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<ScheduleEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitutions: Option<Vec<Substitution>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bell_schedule: Option<BellSchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsPatch>,
}

/// An authenticated identity as reported by the hosted auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

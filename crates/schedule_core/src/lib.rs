pub mod context;
pub mod domain;
pub mod history;
pub mod ports;
pub mod roles;

pub use context::{DataContext, Identity, LocalOnlyReason, NextStep, SaveOutcome};
pub use domain::{
    AppData, AuthUser, BellPeriod, BellSchedule, DocumentPatch, Room, SchoolClass, SchoolDay,
    ScheduleEntry, Settings, SettingsPatch, Shift, Subject, Substitution, Teacher,
};
pub use history::{History, HISTORY_LIMIT};
pub use ports::{AuthService, DocumentStore, PortError, PortResult, PortStream};
pub use roles::{Role, RoleMap, DEFAULT_ADMIN_EMAIL, DEFAULT_TEACHER_EMAIL};

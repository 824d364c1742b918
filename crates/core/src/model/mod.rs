mod api_settings;
mod component;
mod course;
mod draft;
mod fraction;
mod ids;
mod policy;
mod progress;

pub use api_settings::{ApiSettings, ApiSettingsDraft, ApiSettingsError};
pub use component::{ComponentKind, ComponentKindError};
pub use course::{ContentError, Course, CourseClass};
pub use draft::{DraftResponse, DraftSet};
pub use fraction::{Fraction, FractionError};
pub use ids::{ClassId, CourseId, IdError};
pub use policy::{PolicyError, SyncPolicy, SyncPolicyDraft};
pub use progress::{ProgressRecord, ProgressStore, SkipReason, UpdateDecision};

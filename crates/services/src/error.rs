//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{ApiSettingsError, ContentError, IdError, PolicyError};
use storage::repository::StorageError;

/// Errors emitted by `ProgressApi` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressApiError {
    #[error("progress request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Endpoint(#[from] ApiSettingsError),
    #[error("progress backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `ContentApi` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentApiError {
    #[error("content not found")]
    NotFound,
    #[error("content request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Endpoint(#[from] ApiSettingsError),
    #[error(transparent)]
    Invalid(#[from] ContentError),
    #[error(transparent)]
    InvalidId(#[from] IdError),
}

/// Errors emitted by the component shell.
///
/// Only content resolution is fatal; progress sync failures never surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShellError {
    #[error("course {slug:?} has no class {class_index}")]
    ClassNotFound { slug: String, class_index: usize },
    #[error("course {slug:?} not found")]
    CourseNotFound { slug: String },
    #[error(transparent)]
    Content(#[from] ContentApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ShellError {
    /// True for the "content not found" class of failures, which the view
    /// shows as a full-panel error with a retry affordance.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ShellError::ClassNotFound { .. }
                | ShellError::CourseNotFound { .. }
                | ShellError::Content(ContentApiError::NotFound)
        )
    }
}

/// Errors emitted while reading service configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} is not a valid number: {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },
    #[error(transparent)]
    Api(#[from] ApiSettingsError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

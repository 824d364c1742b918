//! Collaborator interfaces consumed by the progress engine.

mod http;

use std::collections::BTreeMap;

use async_trait::async_trait;
use course_core::model::{ClassId, ComponentKind, Course, CourseClass, CourseId, Fraction};

use crate::error::{ContentApiError, ProgressApiError};

pub use http::{HttpContentApi, HttpProgressApi, parse_progress_payload};

/// Server-confirmed fractions of one class, as returned by a batched fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    fractions: BTreeMap<ComponentKind, Fraction>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the larger value if the kind appears twice.
    pub fn insert(&mut self, kind: ComponentKind, fraction: Fraction) {
        let entry = self.fractions.entry(kind).or_insert(fraction);
        *entry = entry.max(fraction);
    }

    #[must_use]
    pub fn get(&self, kind: ComponentKind) -> Option<Fraction> {
        self.fractions.get(&kind).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentKind, Fraction)> + '_ {
        self.fractions.iter().map(|(kind, fraction)| (*kind, *fraction))
    }
}

impl FromIterator<(ComponentKind, Fraction)> for ProgressSnapshot {
    fn from_iter<I: IntoIterator<Item = (ComponentKind, Fraction)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (kind, fraction) in iter {
            snapshot.insert(kind, fraction);
        }
        snapshot
    }
}

/// Backend that stores learner progress.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    /// Fetch every component's progress for a class in one call.
    ///
    /// # Errors
    ///
    /// Returns `ProgressApiError` on transport or status failures.
    async fn fetch_progress(
        &self,
        course_id: &CourseId,
        class_id: &ClassId,
    ) -> Result<ProgressSnapshot, ProgressApiError>;

    /// Store a fraction for one component. Idempotent for equal fractions.
    ///
    /// # Errors
    ///
    /// Returns `ProgressApiError` on transport or status failures.
    async fn update_progress(
        &self,
        course_id: &CourseId,
        class_id: &ClassId,
        kind: ComponentKind,
        fraction: Fraction,
    ) -> Result<(), ProgressApiError>;

    /// Mark one component completed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressApiError` on transport or status failures.
    async fn mark_complete(
        &self,
        course_id: &CourseId,
        class_id: &ClassId,
        kind: ComponentKind,
    ) -> Result<(), ProgressApiError>;
}

/// Backend that resolves course and class content.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ContentApiError::NotFound` for unknown slugs.
    async fn course(&self, slug: &str) -> Result<Course, ContentApiError>;

    /// Resolve a class by its zero-based index in the course.
    ///
    /// # Errors
    ///
    /// Returns `ContentApiError::NotFound` for unknown slugs or indices.
    async fn class(&self, slug: &str, index: usize) -> Result<CourseClass, ContentApiError>;
}

use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::{ClassId, ComponentKind, CourseId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("course slug cannot be empty")]
    EmptySlug,

    #[error("course must contain at least one class")]
    NoClasses,

    #[error("class {index} has no components")]
    NoComponents { index: usize },

    #[error("class {index} lists {kind} more than once")]
    DuplicateComponent { index: usize, kind: ComponentKind },
}

/// Course identity as needed for navigation and progress keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    slug: String,
    title: String,
    class_count: usize,
}

impl Course {
    /// # Errors
    ///
    /// Returns `ContentError` when the slug is blank or the course has no classes.
    pub fn new(
        id: CourseId,
        slug: impl Into<String>,
        title: impl Into<String>,
        class_count: usize,
    ) -> Result<Self, ContentError> {
        let slug = slug.into().trim().to_owned();
        if slug.is_empty() {
            return Err(ContentError::EmptySlug);
        }
        if class_count == 0 {
            return Err(ContentError::NoClasses);
        }
        Ok(Self {
            id,
            slug,
            title: title.into(),
            class_count,
        })
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn class_count(&self) -> usize {
        self.class_count
    }
}

/// One class of a course: an ordered list of components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseClass {
    id: ClassId,
    index: usize,
    title: String,
    components: Vec<ComponentKind>,
    writing_prompts: Vec<String>,
}

impl CourseClass {
    /// # Errors
    ///
    /// Returns `ContentError` if the component list is empty or repeats a kind.
    pub fn new(
        id: ClassId,
        index: usize,
        title: impl Into<String>,
        components: Vec<ComponentKind>,
        writing_prompts: Vec<String>,
    ) -> Result<Self, ContentError> {
        if components.is_empty() {
            return Err(ContentError::NoComponents { index });
        }
        let mut seen = BTreeSet::new();
        for kind in &components {
            if !seen.insert(*kind) {
                return Err(ContentError::DuplicateComponent { index, kind: *kind });
            }
        }
        Ok(Self {
            id,
            index,
            title: title.into(),
            components,
            writing_prompts,
        })
    }

    #[must_use]
    pub fn id(&self) -> &ClassId {
        &self.id
    }

    /// Zero-based position of the class in its course.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn components(&self) -> &[ComponentKind] {
        &self.components
    }

    #[must_use]
    pub fn component(&self, position: usize) -> Option<ComponentKind> {
        self.components.get(position).copied()
    }

    #[must_use]
    pub fn position_of(&self, kind: ComponentKind) -> Option<usize> {
        self.components.iter().position(|k| *k == kind)
    }

    #[must_use]
    pub fn writing_prompts(&self) -> &[String] {
        &self.writing_prompts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_id() -> ClassId {
        ClassId::new("class-1").unwrap()
    }

    #[test]
    fn class_rejects_duplicate_kinds() {
        let err = CourseClass::new(
            class_id(),
            0,
            "Intro",
            vec![ComponentKind::Video, ComponentKind::Video],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ContentError::DuplicateComponent {
                index: 0,
                kind: ComponentKind::Video
            }
        );
    }

    #[test]
    fn class_rejects_empty_components() {
        let err = CourseClass::new(class_id(), 3, "Empty", Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(err, ContentError::NoComponents { index: 3 });
    }

    #[test]
    fn course_requires_classes() {
        let id = CourseId::new("c1").unwrap();
        assert_eq!(
            Course::new(id, "mindful", "Mindful", 0).unwrap_err(),
            ContentError::NoClasses
        );
    }
}

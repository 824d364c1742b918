use std::sync::Arc;

use course_core::model::{ClassId, CourseId, DraftSet};

use crate::repository::{KeyValueStore, StorageError};

/// Storage key of the draft set for one class.
#[must_use]
pub fn draft_key(course_id: &CourseId, class_id: &ClassId) -> String {
    format!("writing_responses_{course_id}_{class_id}")
}

/// Writing-prompt drafts persisted as JSON in the local key-value store.
///
/// Drafts never leave the device and are never deleted automatically.
#[derive(Clone)]
pub struct DraftStore {
    kv: Arc<dyn KeyValueStore>,
}

impl DraftStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load the drafts for a class; an absent entry is an empty set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored JSON is unreadable,
    /// or the store's own error if it cannot be read.
    pub async fn load(
        &self,
        course_id: &CourseId,
        class_id: &ClassId,
    ) -> Result<DraftSet, StorageError> {
        let Some(raw) = self.kv.get(&draft_key(course_id, class_id)).await? else {
            return Ok(DraftSet::new());
        };
        serde_json::from_str(&raw).map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Overwrite the drafts for a class.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or writing fails.
    pub async fn save(
        &self,
        course_id: &CourseId,
        class_id: &ClassId,
        drafts: &DraftSet,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(drafts)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.set(&draft_key(course_id, class_id), &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;

    fn ids() -> (CourseId, ClassId) {
        (CourseId::new("c42").unwrap(), ClassId::new("k7").unwrap())
    }

    #[test]
    fn key_follows_course_and_class() {
        let (course, class) = ids();
        assert_eq!(draft_key(&course, &class), "writing_responses_c42_k7");
    }

    #[tokio::test]
    async fn load_without_entry_is_empty() {
        let store = DraftStore::new(Arc::new(InMemoryStore::new()));
        let (course, class) = ids();
        assert!(store.load(&course, &class).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_keeps_answers() {
        let kv = Arc::new(InMemoryStore::new());
        let store = DraftStore::new(kv.clone());
        let (course, class) = ids();
        let mut drafts = DraftSet::new();
        drafts.set(0, "I noticed my breathing slow down.");
        store.save(&course, &class, &drafts).await.unwrap();

        let raw = kv.get("writing_responses_c42_k7").await.unwrap().unwrap();
        assert!(raw.contains("breathing"));
        let loaded = store.load(&course, &class).await.unwrap();
        assert_eq!(loaded, drafts);
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_serialization_error() {
        let kv = Arc::new(InMemoryStore::new());
        kv.set("writing_responses_c42_k7", "{not json").await.unwrap();
        let store = DraftStore::new(kv);
        let (course, class) = ids();
        let err = store.load(&course, &class).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}

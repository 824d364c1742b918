//! Test doubles shared by unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use course_core::model::{ClassId, ComponentKind, Course, CourseClass, CourseId, Fraction};

use storage::{KeyValueStore, StorageError};

use crate::api::{ContentApi, ProgressApi, ProgressSnapshot};
use crate::error::{ContentApiError, ProgressApiError};
use crate::observer::{SyncEvent, SyncObserver};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteCall {
    Update(ComponentKind, Fraction),
    Complete(ComponentKind),
}

#[derive(Default)]
pub struct RecordingApi {
    progress: ProgressSnapshot,
    fail_fetch: bool,
    fail_writes: AtomicBool,
    writes: Mutex<Vec<WriteCall>>,
}

impl RecordingApi {
    pub fn failing() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    pub fn with_progress(entries: &[(ComponentKind, f64)]) -> Self {
        Self {
            progress: entries
                .iter()
                .map(|(kind, value)| (*kind, Fraction::new(*value).unwrap()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.writes.lock().unwrap().clone()
    }

    fn record(&self, call: WriteCall) -> Result<(), ProgressApiError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ProgressApiError::Unavailable("offline".into()));
        }
        self.writes.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl ProgressApi for RecordingApi {
    async fn fetch_progress(
        &self,
        _course_id: &CourseId,
        _class_id: &ClassId,
    ) -> Result<ProgressSnapshot, ProgressApiError> {
        if self.fail_fetch {
            return Err(ProgressApiError::Unavailable("offline".into()));
        }
        Ok(self.progress.clone())
    }

    async fn update_progress(
        &self,
        _course_id: &CourseId,
        _class_id: &ClassId,
        kind: ComponentKind,
        fraction: Fraction,
    ) -> Result<(), ProgressApiError> {
        self.record(WriteCall::Update(kind, fraction))
    }

    async fn mark_complete(
        &self,
        _course_id: &CourseId,
        _class_id: &ClassId,
        kind: ComponentKind,
    ) -> Result<(), ProgressApiError> {
        self.record(WriteCall::Complete(kind))
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Content for one course, `calm`, with a full class and a short one.
pub struct StaticContent {
    course: Course,
    classes: Vec<CourseClass>,
}

impl StaticContent {
    pub fn sample() -> Self {
        use ComponentKind::*;
        let course = Course::new(CourseId::new("course-calm").unwrap(), "calm", "Calm", 2).unwrap();
        let classes = vec![
            CourseClass::new(
                ClassId::new("class-0").unwrap(),
                0,
                "Breathing",
                vec![Video, KeyConcepts, WritingPrompts, AdditionalMaterials],
                vec!["What did you notice?".into(), "What will you try?".into()],
            )
            .unwrap(),
            CourseClass::new(
                ClassId::new("class-1").unwrap(),
                1,
                "Posture",
                vec![Video, KeyConcepts],
                Vec::new(),
            )
            .unwrap(),
        ];
        Self { course, classes }
    }
}

#[async_trait]
impl ContentApi for StaticContent {
    async fn course(&self, slug: &str) -> Result<Course, ContentApiError> {
        if slug == self.course.slug() {
            Ok(self.course.clone())
        } else {
            Err(ContentApiError::NotFound)
        }
    }

    async fn class(&self, slug: &str, index: usize) -> Result<CourseClass, ContentApiError> {
        if slug != self.course.slug() {
            return Err(ContentApiError::NotFound);
        }
        self.classes
            .get(index)
            .cloned()
            .ok_or(ContentApiError::NotFound)
    }
}

/// Key-value store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    entries: Mutex<std::collections::HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk full".into()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

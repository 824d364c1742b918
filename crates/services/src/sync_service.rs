//! Progress Sync Service: the only writer of a class's `ProgressStore`.
//!
//! Contract: eventually consistent and client-authoritative until reload.
//! Local fractions advance immediately; the backend sees a filtered,
//! non-decreasing subsequence of them. Failures are logged and swallowed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use course_core::model::{
    ClassId, ComponentKind, CourseId, Fraction, ProgressRecord, ProgressStore, SkipReason,
    SyncPolicy, UpdateDecision,
};
use tokio::task::JoinHandle;

use crate::api::{ProgressApi, ProgressSnapshot};
use crate::observer::{SyncEvent, SyncObserver, TracingObserver};
use crate::trackers::ProgressCommand;

/// Result of one `update` or `mark_complete` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    Written(Fraction),
    Completed,
    Skipped(SkipReason),
    Failed,
}

#[derive(Clone)]
pub struct ProgressSyncService {
    api: Arc<dyn ProgressApi>,
    course_id: CourseId,
    class_id: ClassId,
    store: Arc<Mutex<ProgressStore>>,
    observer: Arc<dyn SyncObserver>,
}

impl ProgressSyncService {
    #[must_use]
    pub fn new(
        api: Arc<dyn ProgressApi>,
        course_id: CourseId,
        class_id: ClassId,
        policy: SyncPolicy,
    ) -> Self {
        Self {
            api,
            course_id,
            class_id,
            store: Arc::new(Mutex::new(ProgressStore::new(policy))),
            observer: Arc::new(TracingObserver),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    fn store(&self) -> MutexGuard<'_, ProgressStore> {
        // The store holds plain data; a panic elsewhere cannot leave it torn.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn policy(&self) -> SyncPolicy {
        self.store().policy().clone()
    }

    #[must_use]
    pub fn record(&self, kind: ComponentKind) -> Option<ProgressRecord> {
        self.store().record(kind).cloned()
    }

    #[must_use]
    pub fn fraction(&self, kind: ComponentKind) -> Fraction {
        self.store().fraction(kind)
    }

    #[must_use]
    pub fn is_completed(&self, kind: ComponentKind) -> bool {
        self.store().is_completed(kind)
    }

    #[must_use]
    pub fn aggregate(&self, kinds: &[ComponentKind]) -> Fraction {
        self.store().aggregate(kinds)
    }

    /// Load all component progress for the class and seed the store.
    ///
    /// A failed fetch yields an empty snapshot: the learner starts at zero
    /// rather than being blocked.
    pub async fn fetch(&self) -> ProgressSnapshot {
        match self
            .api
            .fetch_progress(&self.course_id, &self.class_id)
            .await
        {
            Ok(snapshot) => {
                {
                    let mut store = self.store();
                    for (kind, fraction) in snapshot.iter() {
                        store.seed(kind, fraction);
                    }
                }
                self.observer.on_event(&SyncEvent::Fetched {
                    course_id: self.course_id.clone(),
                    class_id: self.class_id.clone(),
                    components: snapshot.len(),
                });
                snapshot
            }
            Err(err) => {
                self.observer.on_event(&SyncEvent::FetchFailed {
                    course_id: self.course_id.clone(),
                    class_id: self.class_id.clone(),
                    error: err.to_string(),
                });
                ProgressSnapshot::new()
            }
        }
    }

    /// Forward a fraction to the backend if the throttle rules allow it.
    pub async fn update(&self, kind: ComponentKind, fraction: Fraction) -> SyncOutcome {
        let decision = self.store().plan_update(kind, fraction);
        let to_write = match decision {
            UpdateDecision::Write(value) => value,
            UpdateDecision::Skip(reason) => {
                self.observer.on_event(&SyncEvent::Skipped {
                    kind,
                    requested: fraction,
                    reason,
                });
                return SyncOutcome::Skipped(reason);
            }
        };

        let result = self
            .api
            .update_progress(&self.course_id, &self.class_id, kind, to_write)
            .await;

        match result {
            Ok(()) => {
                let completed = self.store().confirm_update(kind, to_write);
                self.observer.on_event(&SyncEvent::Written {
                    kind,
                    fraction: to_write,
                });
                if completed {
                    self.observer.on_event(&SyncEvent::Completed { kind });
                }
                SyncOutcome::Written(to_write)
            }
            Err(err) => {
                self.store().abandon_update(kind);
                self.observer.on_event(&SyncEvent::WriteFailed {
                    kind,
                    fraction: to_write,
                    error: err.to_string(),
                });
                SyncOutcome::Failed
            }
        }
    }

    /// Unconditionally complete a component.
    ///
    /// The store flips to completed before the request goes out, so updates
    /// racing with this call are skipped and cannot lower the result.
    pub async fn mark_complete(&self, kind: ComponentKind) -> SyncOutcome {
        let first = self.store().begin_completion(kind);
        let result = self
            .api
            .mark_complete(&self.course_id, &self.class_id, kind)
            .await;
        match result {
            Ok(()) => {
                self.store().confirm_completion(kind);
                if first {
                    self.observer.on_event(&SyncEvent::Completed { kind });
                }
                SyncOutcome::Completed
            }
            Err(err) => {
                self.observer.on_event(&SyncEvent::CompleteFailed {
                    kind,
                    error: err.to_string(),
                });
                SyncOutcome::Failed
            }
        }
    }

    pub async fn apply(&self, command: ProgressCommand) -> SyncOutcome {
        match command {
            ProgressCommand::Update { kind, fraction } => self.update(kind, fraction).await,
            ProgressCommand::MarkComplete { kind } => self.mark_complete(kind).await,
        }
    }

    /// Fire-and-forget variant of [`apply`](Self::apply).
    ///
    /// Must be called from within a tokio runtime. The returned handle may be
    /// dropped; the write still runs to completion in the background.
    pub fn submit(&self, command: ProgressCommand) -> JoinHandle<SyncOutcome> {
        let service = self.clone();
        tokio::spawn(async move { service.apply(command).await })
    }
}

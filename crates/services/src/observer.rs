//! Injectable observability hook for progress sync.

use course_core::model::{ClassId, ComponentKind, CourseId, Fraction, SkipReason};
use tracing::{debug, info, warn};

/// Something the sync service did or declined to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Fetched {
        course_id: CourseId,
        class_id: ClassId,
        components: usize,
    },
    FetchFailed {
        course_id: CourseId,
        class_id: ClassId,
        error: String,
    },
    Skipped {
        kind: ComponentKind,
        requested: Fraction,
        reason: SkipReason,
    },
    Written {
        kind: ComponentKind,
        fraction: Fraction,
    },
    WriteFailed {
        kind: ComponentKind,
        fraction: Fraction,
        error: String,
    },
    Completed {
        kind: ComponentKind,
    },
    CompleteFailed {
        kind: ComponentKind,
        error: String,
    },
}

/// Receives every `SyncEvent`. Implementations must not block.
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

/// Default observer: forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Fetched {
                course_id,
                class_id,
                components,
            } => debug!(%course_id, %class_id, components, "progress fetched"),
            SyncEvent::FetchFailed {
                course_id,
                class_id,
                error,
            } => warn!(%course_id, %class_id, error = %error, "progress fetch failed; starting from zero"),
            SyncEvent::Skipped {
                kind,
                requested,
                reason,
            } => debug!(%kind, ?requested, ?reason, "progress write skipped"),
            SyncEvent::Written { kind, fraction } => {
                debug!(%kind, %fraction, "progress written");
            }
            SyncEvent::WriteFailed {
                kind,
                fraction,
                error,
            } => warn!(%kind, %fraction, error = %error, "progress write failed"),
            SyncEvent::Completed { kind } => info!(%kind, "component completed"),
            SyncEvent::CompleteFailed { kind, error } => {
                warn!(%kind, error = %error, "completion write failed");
            }
        }
    }
}

//! Sans-IO trackers: each turns learner or media events into progress
//! commands for the sync service and never performs I/O itself.

mod media;
mod reading;
mod responses;

use course_core::model::{ComponentKind, Fraction};

pub use media::{MediaEffect, MediaEvent, MediaPlaybackTracker, PlaybackState};
pub use reading::TimedReadingTracker;
pub use responses::ResponseCompletionTracker;

/// A request a tracker hands to the sync service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressCommand {
    Update {
        kind: ComponentKind,
        fraction: Fraction,
    },
    MarkComplete {
        kind: ComponentKind,
    },
}

impl ProgressCommand {
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        match self {
            ProgressCommand::Update { kind, .. } | ProgressCommand::MarkComplete { kind } => *kind,
        }
    }
}

/// Closes once a completion has been submitted, so auto and manual
/// completion can never both fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionGate {
    closed: bool,
}

impl CompletionGate {
    #[must_use]
    pub fn closed() -> Self {
        Self { closed: true }
    }

    /// Returns `true` for the single caller allowed to submit completion.
    pub fn try_close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_admits_one_caller() {
        let mut gate = CompletionGate::default();
        assert!(gate.try_close());
        assert!(!gate.try_close());
        assert!(gate.is_closed());
    }
}

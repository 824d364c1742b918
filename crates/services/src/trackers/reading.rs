use std::time::Duration;

use course_core::model::{ComponentKind, SyncPolicy};
use tokio::time::Instant;

use super::{CompletionGate, ProgressCommand};

const KIND: ComponentKind = ComponentKind::KeyConcepts;

/// Auto-completes a reading component after a fixed foreground dwell time.
#[derive(Debug, Clone)]
pub struct TimedReadingTracker {
    dwell: Duration,
    started_at: Instant,
    elapsed: Duration,
    timer_active: bool,
    gate: CompletionGate,
}

impl TimedReadingTracker {
    #[must_use]
    pub fn new(policy: &SyncPolicy, started_at: Instant, completed: bool) -> Self {
        Self {
            dwell: Duration::from_secs(u64::from(policy.dwell_secs())),
            started_at,
            elapsed: Duration::ZERO,
            timer_active: !completed,
            gate: if completed {
                CompletionGate::closed()
            } else {
                CompletionGate::default()
            },
        }
    }

    /// Seconds spent on the component, for display.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.dwell.saturating_sub(self.elapsed)
    }

    #[must_use]
    pub fn timer_active(&self) -> bool {
        self.timer_active
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Recompute elapsed time; emits completion once the dwell is reached.
    pub fn tick(&mut self, now: Instant) -> Option<ProgressCommand> {
        self.elapsed = now.saturating_duration_since(self.started_at);
        if !self.timer_active || self.elapsed < self.dwell {
            return None;
        }
        self.timer_active = false;
        self.complete()
    }

    /// Learner clicked "mark complete": stops the timer and completes now.
    pub fn mark_complete_manually(&mut self) -> Option<ProgressCommand> {
        self.timer_active = false;
        self.complete()
    }

    /// Completion was submitted elsewhere: stop the timer and keep this
    /// tracker from ever emitting its own.
    pub fn close_gate(&mut self) {
        self.timer_active = false;
        self.gate.close();
    }

    fn complete(&mut self) -> Option<ProgressCommand> {
        self.gate
            .try_close()
            .then_some(ProgressCommand::MarkComplete { kind: KIND })
    }
}

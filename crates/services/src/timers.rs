//! Background drivers owned by a mounted component. Each aborts its task on
//! drop, so unmounting clears the timer deterministically.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::debug;

use crate::sync_service::ProgressSyncService;
use crate::trackers::{MediaEffect, MediaPlaybackTracker, TimedReadingTracker};

/// Ticks a [`TimedReadingTracker`] until it completes or the timer is dropped.
pub struct DwellTimer {
    task: JoinHandle<()>,
}

impl DwellTimer {
    /// Must be called from within a tokio runtime.
    ///
    /// Completion is handed to [`ProgressSyncService::submit`], so dropping the
    /// timer afterwards never cancels the write itself.
    #[must_use]
    pub fn spawn(
        tracker: Arc<Mutex<TimedReadingTracker>>,
        sync: ProgressSyncService,
        every: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let (command, active) = {
                    let mut reading = tracker.lock().unwrap_or_else(PoisonError::into_inner);
                    let command = reading.tick(Instant::now());
                    (command, reading.timer_active())
                };
                if let Some(command) = command {
                    debug!(kind = %command.kind(), "dwell time reached");
                    drop(sync.submit(command));
                }
                if !active {
                    break;
                }
            }
        });
        Self { task }
    }

    /// True once the tracker stopped its timer and the loop exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DwellTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Back,
}

impl SeekDirection {
    pub fn apply(self, tracker: &mut MediaPlaybackTracker) -> Option<MediaEffect> {
        match self {
            SeekDirection::Forward => tracker.skip_forward(),
            SeekDirection::Back => tracker.skip_back(),
        }
    }
}

/// Repeats a fast-seek step while a control is held.
///
/// The first step is emitted immediately. The host drains the receiver and
/// applies each step to its tracker; releasing the control drops this value.
pub struct FastSeekRepeat {
    direction: SeekDirection,
    task: JoinHandle<()>,
}

impl FastSeekRepeat {
    #[must_use]
    pub fn start(direction: SeekDirection, every: Duration) -> (Self, mpsc::Receiver<SeekDirection>) {
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(direction).await.is_err() {
                    break;
                }
            }
        });
        (Self { direction, task }, rx)
    }

    #[must_use]
    pub fn direction(&self) -> SeekDirection {
        self.direction
    }
}

impl Drop for FastSeekRepeat {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod observer;
pub mod shell;
pub mod sync_service;
pub mod timers;
pub mod trackers;

#[cfg(test)]
mod testing;

pub use api::{ContentApi, HttpContentApi, HttpProgressApi, ProgressApi, ProgressSnapshot};
pub use error::{ConfigError, ContentApiError, ProgressApiError, ShellError};
pub use observer::{SyncEvent, SyncObserver, TracingObserver};
pub use shell::{ActiveTracker, ComponentPosition, ComponentShell, Direction, Route, ShellContext};
pub use sync_service::{ProgressSyncService, SyncOutcome};
pub use timers::{DwellTimer, FastSeekRepeat, SeekDirection};
pub use trackers::{
    MediaEffect, MediaEvent, MediaPlaybackTracker, PlaybackState, ProgressCommand,
    ResponseCompletionTracker, TimedReadingTracker,
};

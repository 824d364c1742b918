use course_core::model::{ComponentKind, Fraction, SyncPolicy};

use super::ProgressCommand;

const KIND: ComponentKind = ComponentKind::Video;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    /// The element reported an error; shown as "video not available".
    Unavailable,
}

/// Events observed on the playable element. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    LoadStart,
    MetadataLoaded { duration: f64 },
    Play,
    TimeUpdate { current_time: f64 },
    Seeked { current_time: f64 },
    Pause { current_time: f64 },
    Ended,
    Error,
}

/// What the host must do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEffect {
    /// Move the element's playhead to this position.
    Seek(f64),
    Sync(ProgressCommand),
}

/// Tracks playback of a class video and derives progress writes from it.
///
/// Milestone and safety-net updates are only derived while `Playing`; ticks
/// in any other state just move the recorded position.
#[derive(Debug, Clone)]
pub struct MediaPlaybackTracker {
    policy: SyncPolicy,
    state: PlaybackState,
    duration: Option<f64>,
    position: f64,
    prior: Fraction,
    /// Highest fraction either seeded or emitted.
    reported: Fraction,
    /// Parallel to `policy.milestones()`.
    crossed: Vec<bool>,
    /// Media time of the last emitted update; anchors the safety net.
    anchor: f64,
    completed: bool,
}

impl MediaPlaybackTracker {
    #[must_use]
    pub fn new(policy: SyncPolicy, prior: Fraction, completed: bool) -> Self {
        let crossed = policy.milestones().iter().map(|m| *m <= prior).collect();
        Self {
            policy,
            state: PlaybackState::Idle,
            duration: None,
            position: 0.0,
            prior,
            reported: prior,
            crossed,
            anchor: 0.0,
            completed,
        }
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Current playhead as a fraction, once the duration is known.
    #[must_use]
    pub fn fraction(&self) -> Option<Fraction> {
        self.duration.and_then(|d| Fraction::of(self.position, d))
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Completion happened outside the player, e.g. the shell's explicit
    /// action. Suppresses every further write from this tracker.
    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.state == PlaybackState::Unavailable
    }

    pub fn handle(&mut self, event: MediaEvent) -> Vec<MediaEffect> {
        if self.is_unavailable() {
            return Vec::new();
        }
        match event {
            MediaEvent::LoadStart => {
                if self.state == PlaybackState::Idle {
                    self.state = PlaybackState::Loading;
                }
                Vec::new()
            }
            MediaEvent::MetadataLoaded { duration } => self.on_metadata(duration),
            MediaEvent::Play => self.on_play(),
            MediaEvent::TimeUpdate { current_time } => self.on_time_update(current_time),
            MediaEvent::Seeked { current_time } => {
                self.move_to(current_time);
                Vec::new()
            }
            MediaEvent::Pause { current_time } => self.on_pause(current_time),
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::Error => {
                self.state = PlaybackState::Unavailable;
                Vec::new()
            }
        }
    }

    pub fn skip_forward(&mut self) -> Option<MediaEffect> {
        self.skip_by(self.policy.fast_seek_step_secs())
    }

    pub fn skip_back(&mut self) -> Option<MediaEffect> {
        self.skip_by(-self.policy.fast_seek_step_secs())
    }

    /// Seek relative to the current position, clamped to the media bounds.
    pub fn skip_by(&mut self, delta_secs: f64) -> Option<MediaEffect> {
        if self.is_unavailable() || !delta_secs.is_finite() {
            return None;
        }
        let duration = self.duration?;
        let target = (self.position + delta_secs).clamp(0.0, duration);
        self.move_to(target);
        Some(MediaEffect::Seek(target))
    }

    fn move_to(&mut self, position: f64) {
        if !position.is_finite() {
            return;
        }
        self.position = position;
        // Seeking backwards re-anchors the safety net so replayed time counts.
        if position < self.anchor {
            self.anchor = position;
        }
    }

    fn on_metadata(&mut self, duration: f64) -> Vec<MediaEffect> {
        if !duration.is_finite() || duration <= 0.0 {
            return Vec::new();
        }
        let first_load = self.duration.is_none();
        self.duration = Some(duration);
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Loading) {
            self.state = PlaybackState::Ready;
        }

        let resume_limit = self.policy.completion_threshold(KIND);
        let prior = self.prior.value();
        if !first_load || self.completed || prior <= 0.0 || prior >= resume_limit {
            return Vec::new();
        }
        let target = (prior * duration - self.policy.resume_cushion_secs()).clamp(0.0, duration);
        self.position = target;
        self.anchor = target;
        vec![MediaEffect::Seek(target)]
    }

    fn on_play(&mut self) -> Vec<MediaEffect> {
        let from_start = matches!(
            self.state,
            PlaybackState::Idle | PlaybackState::Loading | PlaybackState::Ready
        );
        self.state = PlaybackState::Playing;

        let start = self.policy.start_fraction();
        if !from_start || self.completed || self.reported >= start {
            return Vec::new();
        }
        self.reported = start;
        self.anchor = self.position;
        for (crossed, milestone) in self.crossed.iter_mut().zip(self.policy.milestones()) {
            if *milestone <= start {
                *crossed = true;
            }
        }
        vec![update(start)]
    }

    fn on_time_update(&mut self, current_time: f64) -> Vec<MediaEffect> {
        self.move_to(current_time);
        if self.state != PlaybackState::Playing || self.completed {
            return Vec::new();
        }
        let Some(current) = self.fraction() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        for (crossed, milestone) in self.crossed.iter_mut().zip(self.policy.milestones()) {
            if !*crossed && current >= *milestone {
                *crossed = true;
                self.reported = self.reported.max(*milestone);
                effects.push(update(*milestone));
            }
        }

        if !effects.is_empty() {
            self.anchor = self.position;
        } else if self.position - self.anchor >= self.policy.safety_net_secs()
            && current > self.reported
        {
            self.reported = current;
            self.anchor = self.position;
            effects.push(update(current));
        }
        effects
    }

    fn on_pause(&mut self, current_time: f64) -> Vec<MediaEffect> {
        self.move_to(current_time);
        if self.state != PlaybackState::Playing {
            return Vec::new();
        }
        self.state = PlaybackState::Paused;
        if self.completed {
            return Vec::new();
        }
        let Some(current) = self.fraction() else {
            return Vec::new();
        };
        self.reported = self.reported.max(current);
        self.anchor = self.position;
        vec![update(current)]
    }

    fn on_ended(&mut self) -> Vec<MediaEffect> {
        self.state = PlaybackState::Ended;
        if self.completed {
            return Vec::new();
        }
        self.completed = true;
        vec![MediaEffect::Sync(ProgressCommand::MarkComplete { kind: KIND })]
    }
}

fn update(fraction: Fraction) -> MediaEffect {
    MediaEffect::Sync(ProgressCommand::Update {
        kind: KIND,
        fraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(value: f64) -> Fraction {
        Fraction::new(value).unwrap()
    }

    fn ready(prior: f64, duration: f64) -> (MediaPlaybackTracker, Vec<MediaEffect>) {
        let mut tracker = MediaPlaybackTracker::new(SyncPolicy::default(), f(prior), false);
        tracker.handle(MediaEvent::LoadStart);
        let effects = tracker.handle(MediaEvent::MetadataLoaded { duration });
        (tracker, effects)
    }

    fn fractions(effects: &[MediaEffect]) -> Vec<f64> {
        effects
            .iter()
            .filter_map(|e| match e {
                MediaEffect::Sync(ProgressCommand::Update { fraction, .. }) => {
                    Some(fraction.value())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn resumes_five_seconds_before_prior_position() {
        let (tracker, effects) = ready(0.40, 100.0);
        assert_eq!(effects, vec![MediaEffect::Seek(35.0)]);
        assert_eq!(tracker.state(), PlaybackState::Ready);
        assert!((tracker.position() - 35.0).abs() < 1e-9);
    }

    #[test]
    fn resume_cushion_never_goes_negative() {
        let (_, effects) = ready(0.02, 100.0);
        assert_eq!(effects, vec![MediaEffect::Seek(0.0)]);
    }

    #[test]
    fn no_resume_for_fresh_or_nearly_finished_video() {
        assert!(ready(0.0, 100.0).1.is_empty());
        assert!(ready(0.96, 100.0).1.is_empty());
    }

    #[test]
    fn unknown_duration_skips_fraction_work() {
        let mut tracker = MediaPlaybackTracker::new(SyncPolicy::default(), f(0.5), false);
        assert!(tracker.handle(MediaEvent::MetadataLoaded { duration: f64::NAN }).is_empty());
        assert!(tracker.handle(MediaEvent::MetadataLoaded { duration: 0.0 }).is_empty());
        tracker.handle(MediaEvent::Play);
        assert!(tracker.handle(MediaEvent::TimeUpdate { current_time: 80.0 }).is_empty());
        assert!(tracker.handle(MediaEvent::Pause { current_time: 80.0 }).is_empty());
        assert_eq!(tracker.fraction(), None);
    }

    #[test]
    fn first_play_marks_started_once() {
        let (mut tracker, _) = ready(0.0, 200.0);
        assert_eq!(fractions(&tracker.handle(MediaEvent::Play)), vec![0.10]);
        tracker.handle(MediaEvent::Pause { current_time: 1.0 });
        assert!(fractions(&tracker.handle(MediaEvent::Play)).is_empty());
    }

    #[test]
    fn play_does_not_restart_when_prior_progress_exists() {
        let (mut tracker, _) = ready(0.30, 200.0);
        assert!(tracker.handle(MediaEvent::Play).is_empty());
    }

    #[test]
    fn seeking_past_milestones_reports_each_once() {
        let (mut tracker, _) = ready(0.0, 200.0);
        tracker.handle(MediaEvent::Play);
        let effects = tracker.handle(MediaEvent::TimeUpdate { current_time: 130.0 });
        assert_eq!(fractions(&effects), vec![0.25, 0.50]);
        let again = tracker.handle(MediaEvent::TimeUpdate { current_time: 131.0 });
        assert!(again.is_empty());
    }

    #[test]
    fn safety_net_reports_every_fifteen_seconds_of_playback() {
        let (mut tracker, _) = ready(0.0, 1000.0);
        tracker.handle(MediaEvent::Play);
        assert!(tracker.handle(MediaEvent::TimeUpdate { current_time: 14.0 }).is_empty());
        // 0.11 is past the start mark and 110s after the anchor.
        assert_eq!(
            fractions(&tracker.handle(MediaEvent::TimeUpdate { current_time: 110.0 })),
            vec![0.11]
        );
        assert!(tracker.handle(MediaEvent::TimeUpdate { current_time: 120.0 }).is_empty());
        assert_eq!(
            fractions(&tracker.handle(MediaEvent::TimeUpdate { current_time: 126.0 })),
            vec![0.126]
        );
    }

    #[test]
    fn paused_ticks_never_emit_milestones() {
        let (mut tracker, _) = ready(0.0, 200.0);
        tracker.handle(MediaEvent::Play);
        tracker.handle(MediaEvent::Pause { current_time: 10.0 });
        assert!(tracker.handle(MediaEvent::TimeUpdate { current_time: 190.0 }).is_empty());
        assert!((tracker.position() - 190.0).abs() < 1e-9);
    }

    #[test]
    fn ended_completes_exactly_once() {
        let (mut tracker, _) = ready(0.0, 200.0);
        tracker.handle(MediaEvent::Play);
        let effects = tracker.handle(MediaEvent::Ended);
        assert_eq!(
            effects,
            vec![MediaEffect::Sync(ProgressCommand::MarkComplete { kind: KIND })]
        );
        tracker.handle(MediaEvent::Play);
        assert!(tracker.handle(MediaEvent::TimeUpdate { current_time: 250.0 }).is_empty());
        assert!(tracker.handle(MediaEvent::Ended).is_empty());
    }

    #[test]
    fn error_makes_video_unavailable() {
        let (mut tracker, _) = ready(0.0, 200.0);
        tracker.handle(MediaEvent::Error);
        assert!(tracker.is_unavailable());
        assert!(tracker.handle(MediaEvent::Play).is_empty());
        assert!(tracker.handle(MediaEvent::Ended).is_empty());
        assert_eq!(tracker.skip_forward(), None);
    }

    #[test]
    fn fast_seek_is_clamped_to_media_bounds() {
        let (mut tracker, _) = ready(0.0, 25.0);
        assert_eq!(tracker.skip_back(), Some(MediaEffect::Seek(0.0)));
        assert_eq!(tracker.skip_forward(), Some(MediaEffect::Seek(10.0)));
        assert_eq!(tracker.skip_forward(), Some(MediaEffect::Seek(20.0)));
        assert_eq!(tracker.skip_forward(), Some(MediaEffect::Seek(25.0)));
    }

    #[test]
    fn watch_pause_seek_and_end() {
        let (mut tracker, effects) = ready(0.0, 200.0);
        assert!(effects.is_empty());

        let mut issued = Vec::new();
        issued.extend(tracker.handle(MediaEvent::Play));
        for t in [20.0, 50.0, 100.0, 150.0] {
            issued.extend(tracker.handle(MediaEvent::TimeUpdate { current_time: t }));
        }
        issued.extend(tracker.handle(MediaEvent::Pause { current_time: 150.0 }));
        assert_eq!(fractions(&issued), vec![0.10, 0.25, 0.50, 0.75, 0.75]);

        let mut tail = Vec::new();
        tail.extend(tracker.handle(MediaEvent::Seeked { current_time: 200.0 }));
        tail.extend(tracker.handle(MediaEvent::TimeUpdate { current_time: 200.0 }));
        tail.extend(tracker.handle(MediaEvent::Ended));
        assert_eq!(
            tail,
            vec![MediaEffect::Sync(ProgressCommand::MarkComplete { kind: KIND })]
        );
    }
}

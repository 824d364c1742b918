use thiserror::Error;

use crate::model::{ComponentKind, Fraction};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PolicyError {
    #[error("minimum sync delta must be in (0, 1)")]
    InvalidMinDelta,

    #[error("{field} must be in (0, 1]")]
    InvalidThreshold { field: &'static str },

    #[error("milestones must be non-empty, ascending and within (0, 1]")]
    InvalidMilestones,

    #[error("{field} must be > 0 seconds")]
    InvalidInterval { field: &'static str },

    #[error("resume cushion cannot be negative")]
    InvalidResumeCushion,

    #[error("minimum response length must be > 0")]
    InvalidMinResponseChars,
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Tunables shared by the sync service and every tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPolicy {
    min_delta: f64,
    sync_boundary: f64,
    video_completion: f64,
    reading_completion: f64,
    start_fraction: Fraction,
    milestones: Vec<Fraction>,
    safety_net_secs: f64,
    resume_cushion_secs: f64,
    dwell_secs: u32,
    tick_secs: u32,
    min_response_chars: usize,
    fast_seek_step_secs: f64,
}

/// Unvalidated policy values, e.g. read from config.
#[derive(Debug, Clone)]
pub struct SyncPolicyDraft {
    pub min_delta: f64,
    pub sync_boundary: f64,
    pub video_completion: f64,
    pub reading_completion: f64,
    pub start_fraction: f64,
    pub milestones: Vec<f64>,
    pub safety_net_secs: f64,
    pub resume_cushion_secs: f64,
    pub dwell_secs: u32,
    pub tick_secs: u32,
    pub min_response_chars: usize,
    pub fast_seek_step_secs: f64,
}

impl Default for SyncPolicyDraft {
    fn default() -> Self {
        Self {
            min_delta: 0.05,
            sync_boundary: 0.95,
            video_completion: 0.95,
            reading_completion: 0.99,
            start_fraction: 0.10,
            milestones: vec![0.10, 0.25, 0.50, 0.75, 0.90, 1.00],
            safety_net_secs: 15.0,
            resume_cushion_secs: 5.0,
            dwell_secs: 180,
            tick_secs: 1,
            min_response_chars: 20,
            fast_seek_step_secs: 10.0,
        }
    }
}

impl SyncPolicyDraft {
    /// Validate the draft into a usable policy.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` naming the first out-of-range value.
    pub fn validate(self) -> Result<SyncPolicy, PolicyError> {
        if !(self.min_delta > 0.0 && self.min_delta < 1.0) {
            return Err(PolicyError::InvalidMinDelta);
        }
        let unit = |value: f64, field: &'static str| {
            if value > 0.0 && value <= 1.0 {
                Ok(value)
            } else {
                Err(PolicyError::InvalidThreshold { field })
            }
        };
        let sync_boundary = unit(self.sync_boundary, "sync boundary")?;
        let video_completion = unit(self.video_completion, "video completion")?;
        let reading_completion = unit(self.reading_completion, "reading completion")?;
        let start_fraction = Fraction::new(unit(self.start_fraction, "start fraction")?)
            .map_err(|_| PolicyError::InvalidThreshold {
                field: "start fraction",
            })?;

        if self.milestones.is_empty()
            || self.milestones.windows(2).any(|w| w[0] >= w[1])
            || self.milestones.iter().any(|m| !(*m > 0.0 && *m <= 1.0))
        {
            return Err(PolicyError::InvalidMilestones);
        }
        let milestones = self
            .milestones
            .into_iter()
            .map(Fraction::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| PolicyError::InvalidMilestones)?;

        if !(self.safety_net_secs.is_finite() && self.safety_net_secs > 0.0) {
            return Err(PolicyError::InvalidInterval {
                field: "safety net interval",
            });
        }
        if !(self.fast_seek_step_secs.is_finite() && self.fast_seek_step_secs > 0.0) {
            return Err(PolicyError::InvalidInterval {
                field: "fast seek step",
            });
        }
        if self.dwell_secs == 0 {
            return Err(PolicyError::InvalidInterval {
                field: "reading dwell",
            });
        }
        if self.tick_secs == 0 {
            return Err(PolicyError::InvalidInterval {
                field: "reading tick",
            });
        }
        if !(self.resume_cushion_secs.is_finite() && self.resume_cushion_secs >= 0.0) {
            return Err(PolicyError::InvalidResumeCushion);
        }
        if self.min_response_chars == 0 {
            return Err(PolicyError::InvalidMinResponseChars);
        }

        Ok(SyncPolicy {
            min_delta: self.min_delta,
            sync_boundary,
            video_completion,
            reading_completion,
            start_fraction,
            milestones,
            safety_net_secs: self.safety_net_secs,
            resume_cushion_secs: self.resume_cushion_secs,
            dwell_secs: self.dwell_secs,
            tick_secs: self.tick_secs,
            min_response_chars: self.min_response_chars,
            fast_seek_step_secs: self.fast_seek_step_secs,
        })
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        let defaults = SyncPolicyDraft::default();
        Self {
            min_delta: defaults.min_delta,
            sync_boundary: defaults.sync_boundary,
            video_completion: defaults.video_completion,
            reading_completion: defaults.reading_completion,
            start_fraction: Fraction::clamped(defaults.start_fraction).unwrap_or_default(),
            milestones: defaults
                .milestones
                .into_iter()
                .filter_map(Fraction::clamped)
                .collect(),
            safety_net_secs: defaults.safety_net_secs,
            resume_cushion_secs: defaults.resume_cushion_secs,
            dwell_secs: defaults.dwell_secs,
            tick_secs: defaults.tick_secs,
            min_response_chars: defaults.min_response_chars,
            fast_seek_step_secs: defaults.fast_seek_step_secs,
        }
    }
}

impl SyncPolicy {
    /// Smallest advance over the last confirmed value that justifies a write.
    #[must_use]
    pub fn min_delta(&self) -> f64 {
        self.min_delta
    }

    /// Crossing this value always justifies a write, whatever the delta.
    #[must_use]
    pub fn sync_boundary(&self) -> f64 {
        self.sync_boundary
    }

    /// Fraction at which a component counts as completed.
    ///
    /// Video completes at 0.95; the reading-style components at 0.99.
    #[must_use]
    pub fn completion_threshold(&self, kind: ComponentKind) -> f64 {
        match kind {
            ComponentKind::Video => self.video_completion,
            ComponentKind::KeyConcepts
            | ComponentKind::WritingPrompts
            | ComponentKind::AdditionalMaterials => self.reading_completion,
        }
    }

    /// Fraction written when the learner starts a component.
    #[must_use]
    pub fn start_fraction(&self) -> Fraction {
        self.start_fraction
    }

    #[must_use]
    pub fn milestones(&self) -> &[Fraction] {
        &self.milestones
    }

    #[must_use]
    pub fn safety_net_secs(&self) -> f64 {
        self.safety_net_secs
    }

    #[must_use]
    pub fn resume_cushion_secs(&self) -> f64 {
        self.resume_cushion_secs
    }

    #[must_use]
    pub fn dwell_secs(&self) -> u32 {
        self.dwell_secs
    }

    #[must_use]
    pub fn tick_secs(&self) -> u32 {
        self.tick_secs
    }

    #[must_use]
    pub fn min_response_chars(&self) -> usize {
        self.min_response_chars
    }

    #[must_use]
    pub fn fast_seek_step_secs(&self) -> f64 {
        self.fast_seek_step_secs
    }
}

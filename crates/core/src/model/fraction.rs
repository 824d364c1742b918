use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum FractionError {
    #[error("fraction must be a finite number")]
    NotFinite,

    #[error("fraction {0} is outside [0, 1]")]
    OutOfRange(f64),
}

/// Normalized progress value in `[0.0, 1.0]`.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Fraction(f64);

impl Fraction {
    pub const ZERO: Fraction = Fraction(0.0);
    pub const ONE: Fraction = Fraction(1.0);

    /// Strict constructor.
    ///
    /// # Errors
    ///
    /// Returns `FractionError` for NaN, infinities, or values outside `[0, 1]`.
    pub fn new(value: f64) -> Result<Self, FractionError> {
        if !value.is_finite() {
            return Err(FractionError::NotFinite);
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(FractionError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Clamps into `[0, 1]`; `None` when the value is not finite.
    #[must_use]
    pub fn clamped(value: f64) -> Option<Self> {
        value.is_finite().then(|| Self(value.clamp(0.0, 1.0)))
    }

    /// `position / duration`, or `None` while the duration is unknown (NaN or 0).
    #[must_use]
    pub fn of(position: f64, duration: f64) -> Option<Self> {
        if !duration.is_finite() || duration <= 0.0 || !position.is_finite() {
            return None;
        }
        Self::clamped(position / duration)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn max(self, other: Fraction) -> Fraction {
        if other.0 > self.0 { other } else { self }
    }

    /// Whole percent, rounded down.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(self) -> u8 {
        (self.0 * 100.0 + 1e-9).floor() as u8
    }
}

impl TryFrom<f64> for Fraction {
    type Error = FractionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Fraction> for f64 {
    fn from(f: Fraction) -> Self {
        f.0
    }
}

impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fraction({})", self.0)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

//! Rating score type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Score`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// The value is NaN or infinite.
    #[error("score must be a finite number")]
    NotFinite,
    /// The value is outside the allowed range.
    #[error("score must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// Value that was rejected.
        value: f64,
        /// Minimum allowed score.
        min: f64,
        /// Maximum allowed score.
        max: f64,
    },
}

/// A star score between [`Score::MIN`] and [`Score::MAX`], inclusive.
///
/// Half stars are allowed. Stored as a plain JSON number in the `rating` field.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Score(f64);

impl Score {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 5.0;

    /// Create a validated score.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not finite or outside `[1, 5]`.
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite);
        }
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ScoreError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Score {
    type Error = ScoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

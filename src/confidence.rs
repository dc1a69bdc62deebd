//! Confidence values for extracted facts.
//!
//! Every field a source contributes carries a confidence in [0.0, 1.0].
//! A single unconfirmed source can never assert certainty: per-field
//! confidence from one source is capped below 1.0, and only corroboration
//! across independent sources raises a value toward the global cap.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated confidence value in [0.0, 1.0].
///
/// # Examples
///
/// ```
/// use dossier::Confidence;
///
/// let conf = Confidence::new(0.7).unwrap();
/// assert_eq!(conf.value(), 0.7);
/// assert!(conf.is_medium());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Confidence(f32);

impl Confidence {
    /// Minimum valid confidence value.
    pub const MIN_VALUE: f32 = 0.0;

    /// Maximum valid confidence value.
    pub const MAX_VALUE: f32 = 1.0;

    /// Creates a new confidence with validation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ConfidenceOutOfRange` if the value is NaN
    /// or not in [0.0, 1.0].
    pub fn new(value: f32) -> Result<Self, ValidationError> {
        if value.is_nan() || !(Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value) {
            return Err(ValidationError::ConfidenceOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Creates a confidence by clamping an arbitrary value into range.
    ///
    /// NaN clamps to zero.
    #[must_use]
    pub fn clamped(value: f32) -> Self {
        if value.is_nan() {
            return Self::zero();
        }
        Self(value.clamp(Self::MIN_VALUE, Self::MAX_VALUE))
    }

    /// Creates a zero confidence (complete uncertainty).
    #[must_use]
    pub const fn zero() -> Self {
        Self(0.0)
    }

    /// Builds a per-field confidence from an optional source hint.
    ///
    /// The hint (or `default` when absent) is clamped to `cap`: a single
    /// unconfirmed source cannot claim more than the cap allows.
    #[must_use]
    pub fn from_hint(hint: Option<f32>, default: f32, cap: f32) -> Self {
        let raw = hint.unwrap_or(default);
        Self::clamped(raw.min(cap))
    }

    /// Returns the confidence value.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }

    /// Returns true if the value is at least 0.8.
    #[must_use]
    pub fn is_high(&self) -> bool {
        self.0 >= 0.8
    }

    /// Returns true if the value is in [0.5, 0.8).
    #[must_use]
    pub fn is_medium(&self) -> bool {
        self.0 >= 0.5 && self.0 < 0.8
    }

    /// Returns true if the value is below 0.5.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.0 < 0.5
    }

    /// Combines with another confidence, keeping the larger value.
    ///
    /// Corroboration never lowers confidence.
    #[must_use]
    pub fn or(&self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Combines with another confidence, keeping the smaller value.
    #[must_use]
    pub fn and(&self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Adds a corroboration bonus, capped at `cap`.
    ///
    /// If the current value already exceeds `cap` it is left unchanged
    /// rather than reduced.
    #[must_use]
    pub fn boosted(&self, bonus: f32, cap: f32) -> Self {
        let boosted = (self.0 + bonus).min(cap);
        Self::clamped(boosted.max(self.0))
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = f32::deserialize(deserializer)?;
        Confidence::new(raw).map_err(serde::de::Error::custom)
    }
}

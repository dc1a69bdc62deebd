//! Error types for dossier.
//!
//! All errors are strongly typed using thiserror. Normalization errors are
//! recoverable by policy: a malformed finding is skipped and flagged, it
//! never aborts a graph build.

use thiserror::Error;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Confidence value {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange {
        value: f32,
    },

    #[error("Query has no usable signal: at least one of name, phone, or email is required")]
    MissingQuerySignal,

    #[error("Person name cannot be empty")]
    EmptyName,

    #[error("Invalid age range: min ({min}) must not exceed max ({max})")]
    InvalidAgeRange {
        min: u8,
        max: u8,
    },

    #[error("Invalid scoring policy: {reason}")]
    InvalidPolicy {
        reason: String,
    },
}

/// Errors raised while normalizing a single raw finding.
///
/// These are recoverable: the normalizer logs the skip and continues with
/// the remaining findings in the batch.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Payload from '{source_name}' does not match the '{agent_type}' shape: {reason}")]
    PayloadShapeMismatch {
        source_name: String,
        agent_type: String,
        reason: String,
    },

    #[error("No extractor registered for agent type '{agent_type}' (source '{source_name}')")]
    UnknownSourceShape {
        source_name: String,
        agent_type: String,
    },
}

/// Top-level error type for dossier.
#[derive(Debug, Error)]
pub enum DossierError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl DossierError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a normalization error.
    #[must_use]
    pub const fn is_normalize(&self) -> bool {
        matches!(self, Self::Normalize(_))
    }

    /// Returns true if the overall investigation can proceed despite this
    /// error. Normalization errors degrade a single finding's contribution;
    /// validation and internal errors reject the request itself.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Normalize(_))
    }
}

/// Result type alias for dossier operations.
pub type DossierResult<T> = Result<T, DossierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_confidence() {
        let err = ValidationError::ConfidenceOutOfRange { value: 1.5 };
        let msg = format!("{err}");
        assert!(msg.contains("1.5"));
        assert!(msg.contains("out of range"));
    }

    #[test]
    fn test_validation_error_age_range() {
        let err = ValidationError::InvalidAgeRange { min: 40, max: 30 };
        let msg = format!("{err}");
        assert!(msg.contains("40"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_normalize_error_shape_mismatch() {
        let err = NormalizeError::PayloadShapeMismatch {
            source_name: "truepeoplesearch".to_string(),
            agent_type: "person_search".to_string(),
            reason: "missing persons array".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("truepeoplesearch"));
        assert!(msg.contains("persons array"));
    }

    #[test]
    fn test_dossier_error_from_validation() {
        let err: DossierError = ValidationError::MissingQuerySignal.into();
        assert!(err.is_validation());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_dossier_error_from_normalize() {
        let err: DossierError = NormalizeError::UnknownSourceShape {
            source_name: "mystery".to_string(),
            agent_type: "mystery_probe".to_string(),
        }
        .into();
        assert!(err.is_normalize());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_dossier_error_internal() {
        let err = DossierError::internal("unexpected state");
        assert!(!err.is_recoverable());
        assert!(format!("{err}").contains("unexpected state"));
    }
}

//! Error types shared across the deal-lifecycle engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-field validation detail attached to invalid-input errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field path, e.g. `inputs.planDurationYears`
    pub field: String,
    /// Human-readable problem description
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for deal-lifecycle operations.
#[derive(Error, Debug)]
pub enum DealdeskError {
    /// Input failed validation; carries per-field detail
    #[error("Invalid input")]
    InvalidInput { details: Vec<FieldError> },

    /// Actor role is not permitted to perform the action
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Entity is not in the state the operation requires
    #[error("{0}")]
    StateMismatch(String),

    /// Cross-entity precondition does not hold
    #[error("{0}")]
    InvariantViolation(String),

    /// Required pricing or standard plan configuration is absent
    #[error("{0}")]
    ConfigMissing(String),

    /// Unexpected failure (storage, serialization, ...)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable error codes, one per surface-visible kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    Forbidden,
    NotFound,
    StateMismatch,
    InvariantViolation,
    ConfigMissing,
    Internal,
}

impl DealdeskError {
    /// Create an invalid-input error from field details.
    pub fn invalid_input(details: Vec<FieldError>) -> Self {
        Self::InvalidInput { details }
    }

    /// Create an invalid-input error for a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            details: vec![FieldError::new(field, message)],
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a not-found error; `what` names the entity, e.g. "Payment plan".
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a state-mismatch error.
    pub fn state_mismatch(msg: impl Into<String>) -> Self {
        Self::StateMismatch(msg.into())
    }

    /// Create an invariant-violation error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a config-missing error.
    pub fn config_missing(msg: impl Into<String>) -> Self {
        Self::ConfigMissing(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::StateMismatch(_) => ErrorKind::StateMismatch,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::ConfigMissing(_) => ErrorKind::ConfigMissing,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Field details when this is an invalid-input error.
    pub fn field_details(&self) -> Option<&[FieldError]> {
        match self {
            Self::InvalidInput { details } => Some(details),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DealdeskError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("Serialization error: {e}"))
    }
}

/// Result type alias for deal-lifecycle operations.
pub type DealdeskResult<T> = Result<T, DealdeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            DealdeskError::invalid_field("x", "bad").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            DealdeskError::forbidden("nope").kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(DealdeskError::not_found("Unit").kind(), ErrorKind::NotFound);
        assert_eq!(
            DealdeskError::state_mismatch("not pending").kind(),
            ErrorKind::StateMismatch
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = DealdeskError::not_found("Payment plan");
        assert_eq!(err.to_string(), "Payment plan not found");
    }

    #[test]
    fn test_field_details() {
        let err = DealdeskError::invalid_input(vec![
            FieldError::new("a", "missing"),
            FieldError::new("b", "negative"),
        ]);
        assert_eq!(err.field_details().unwrap().len(), 2);
        assert!(DealdeskError::forbidden("x").field_details().is_none());
    }
}

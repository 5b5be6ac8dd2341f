//! The closed set of error kinds every core service reports through.
//!
//! Every variant here is a kind from the IPC error-payload contract: a kind
//! code plus a human-readable message. Callers match on kind, never on the
//! message text.

use thiserror::Error;

/// A core-service error. Closed set by design — do not add variants without
/// updating the kind-code table callers rely on.
#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Exists(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("interrupted: {0}")]
    Interrupted(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable kind code for the IPC error payload's kind field (§6/§7).
    pub fn kind_code(&self) -> &'static str {
        match self {
            CoreError::InvalidArgument(_) => "invalid_argument",
            CoreError::NotFound(_) => "not_found",
            CoreError::Exists(_) => "exists",
            CoreError::InvalidState(_) => "invalid_state",
            CoreError::Unsupported(_) => "unsupported",
            CoreError::Interrupted(_) => "interrupted",
            CoreError::Integrity(_) => "integrity",
            CoreError::Timeout(_) => "timeout",
            CoreError::Internal(_) => "internal_error",
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CoreError::Internal(msg.into())
    }
}

/// Convenience alias used throughout `boxd`.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(e.to_string()),
            std::io::ErrorKind::AlreadyExists => CoreError::Exists(e.to_string()),
            _ => CoreError::Internal(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Internal(format!("(de)serialization failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(CoreError::InvalidArgument("x".into()).kind_code(), "invalid_argument");
        assert_eq!(CoreError::NotFound("x".into()).kind_code(), "not_found");
        assert_eq!(CoreError::Exists("x".into()).kind_code(), "exists");
        assert_eq!(CoreError::InvalidState("x".into()).kind_code(), "invalid_state");
        assert_eq!(CoreError::Unsupported("x".into()).kind_code(), "unsupported");
        assert_eq!(CoreError::Interrupted("x".into()).kind_code(), "interrupted");
        assert_eq!(CoreError::Integrity("x".into()).kind_code(), "integrity");
        assert_eq!(CoreError::Timeout("x".into()).kind_code(), "timeout");
        assert_eq!(CoreError::Internal("x".into()).kind_code(), "internal_error");
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let core_err: CoreError = io_err.into();
        assert_eq!(core_err.kind_code(), "not_found");
    }
}

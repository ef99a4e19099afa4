//! Operation error type

use thiserror::Error;

/// Error returned by a wrapped delete/update/create handler.
///
/// A handler that errors (or resolves `false`) never triggers a refresh;
/// user-visible notification stays with the caller-supplied handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationError {
    /// Error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for OperationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for OperationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

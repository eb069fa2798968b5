//! Error types for myqb

use thiserror::Error;

/// Result type alias for builder operations
pub type QbResult<T> = Result<T, QbError>;

/// Error types for statement assembly.
///
/// All errors are fatal to the call that reported them: a builder that
/// recorded an error is poisoned and should be discarded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QbError {
    /// An operation was called in a state that forbids it
    /// (table or statement kind set twice, `set` without `update`, ...)
    #[error("state error: {0}")]
    State(String),

    /// Input data failed validation
    /// (blank condition on a mutating statement, mismatched insert rows, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// A template placeholder resolved to an unusable value
    #[error("format error: {0}")]
    Format(String),
}

impl QbError {
    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a format error
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Check if this is a state error
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a format error
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

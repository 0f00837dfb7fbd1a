//! Core Error Types
//!
//! Error types shared across the workspace. Uses thiserror for ergonomic
//! error definitions.

use thiserror::Error;

/// Core error type for model validation and pure computation failures
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input or payload failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

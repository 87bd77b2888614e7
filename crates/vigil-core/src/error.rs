//! Core error types.

use thiserror::Error;

/// Errors produced while interpreting trace data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A decision string was neither `approve` nor `reject`.
    #[error("invalid decision '{0}': expected 'approve' or 'reject'")]
    InvalidDecision(String),

    /// A trace could not be decoded.
    #[error("invalid trace: {0}")]
    InvalidTrace(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

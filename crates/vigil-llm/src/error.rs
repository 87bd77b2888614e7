//! LLM-related error types.

use thiserror::Error;

/// Errors that can occur while talking to a model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured.
    #[error("API key not configured for {provider}")]
    ApiKeyNotConfigured {
        /// Provider name.
        provider: String,
    },

    /// API request failed before a response arrived.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// The provider answered with a non-success status or an unreadable body.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The response stream broke or reported an error.
    #[error("Streaming error: {0}")]
    StreamingError(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

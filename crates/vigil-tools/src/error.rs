//! Tool execution errors.
//!
//! The `Display` text of every variant is what the user ends up reading in
//! the conversation, so the wording is part of the contract.

/// Tool execution errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// The model produced arguments that do not fit the schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The upstream answered, but with nothing for this query.
    #[error("{0}")]
    NotFound(String),

    /// The operation failed; the message is safe to show.
    #[error("{0}")]
    Failed(String),

    /// The request was cancelled before the tool finished.
    #[error("Tool execution cancelled")]
    Cancelled,

    /// The tool exceeded its time budget.
    #[error("Tool execution timed out after {0}s")]
    Timeout(u64),
}

/// Result type for tool execution.
pub type ToolResult<T> = Result<T, ToolError>;

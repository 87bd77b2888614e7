//! Orchestrator error types.

use thiserror::Error;

/// A trace or decision set the orchestrator refuses to interpret.
///
/// These fail the whole request; the orchestrator never guesses intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// Two units share a call id.
    #[error("duplicate callId {call_id:?} in trace")]
    DuplicateCallId {
        /// The repeated id.
        call_id: String,
    },

    /// A decision names a call that is not in the trace.
    #[error("decision for unknown callId {call_id:?}")]
    UnknownDecisionTarget {
        /// The unmatched id.
        call_id: String,
    },

    /// A decision was supplied for a tool that never needs one.
    #[error("decision for callId {call_id:?} but {tool_name} does not require confirmation")]
    DecisionForAutoTool {
        /// Call id.
        call_id: String,
        /// Tool name.
        tool_name: String,
    },

    /// The unit's slot and the decision map disagree.
    #[error("conflicting decisions for callId {call_id:?}")]
    ConflictingDecision {
        /// Call id.
        call_id: String,
    },

    /// The slot holds a decision but the unit is still `requested`.
    #[error("callId {call_id:?} carries a decision but its status is not resolved")]
    DecisionWithoutResolvedStatus {
        /// Call id.
        call_id: String,
    },

    /// The slot holds a payload but the unit is still `requested`.
    #[error("callId {call_id:?} carries an outcome but its status is not resolved")]
    OutcomeWithoutResolvedStatus {
        /// Call id.
        call_id: String,
    },

    /// A pending decision sits in a message that is no longer the last one.
    #[error("decision for callId {call_id:?} in historical message {message_index}")]
    StaleDecision {
        /// Call id.
        call_id: String,
        /// Index of the message holding it.
        message_index: usize,
    },
}

/// Errors from the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The request violates the trace protocol.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// The reasoning loop failed.
    #[error("LLM error: {0}")]
    Llm(#[from] vigil_llm::LlmError),

    /// The caller went away.
    #[error("request cancelled")]
    Cancelled,
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

//! Outbound stream frames.
//!
//! Every request produces an ordered sequence of frames. Frames of one kind
//! are self-ordered (text deltas in generation order, one result per call),
//! while frames of different kinds interleave freely.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why the reasoning loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// The loop produced final text.
    Stop,
    /// A confirmation-required call is waiting for a human decision.
    AwaitingConfirmation,
    /// The step bound was reached without final text.
    MaxSteps,
}

/// A single event on the outgoing stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StreamFrame {
    /// Incremental text from the reasoning loop.
    Text {
        /// Text fragment.
        delta: String,
    },
    /// The reasoning loop requested a tool call.
    ToolCall {
        /// Call identifier.
        call_id: String,
        /// Tool name.
        tool_name: String,
        /// Tool arguments.
        arguments: Value,
    },
    /// Terminal result of one tool call.
    ToolResult {
        /// Call identifier.
        call_id: String,
        /// The payload written into the unit's result slot.
        payload: Value,
    },
    /// The loop stopped for the given reason.
    Finish {
        /// Stop reason.
        reason: FinishReason,
    },
    /// The request failed after streaming began.
    Error {
        /// Diagnostic message.
        message: String,
    },
    /// End of stream.
    Done,
}

impl StreamFrame {
    /// The call this frame belongs to, for tool frames.
    #[must_use]
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::ToolCall { call_id, .. } | Self::ToolResult { call_id, .. } => Some(call_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_frame_json() {
        let frame = StreamFrame::ToolResult {
            call_id: "c1".to_string(),
            payload: json!({"success": false, "message": "cancelled by user"}),
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "type": "toolResult",
                "callId": "c1",
                "payload": {"success": false, "message": "cancelled by user"}
            })
        );
    }

    #[test]
    fn test_text_and_done_frames_json() {
        let text = StreamFrame::Text {
            delta: "Hel".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&text).unwrap(),
            r#"{"type":"text","delta":"Hel"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamFrame::Done).unwrap(),
            r#"{"type":"done"}"#
        );
    }

    #[test]
    fn test_finish_reason_kebab_case() {
        let frame = StreamFrame::Finish {
            reason: FinishReason::MaxSteps,
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"type": "finish", "reason": "max-steps"})
        );
    }

    #[test]
    fn test_call_id_accessor() {
        let frame = StreamFrame::ToolCall {
            call_id: "c2".to_string(),
            tool_name: "getStockQuote".to_string(),
            arguments: json!({"symbol": "MSFT"}),
        };
        assert_eq!(frame.call_id(), Some("c2"));
        assert_eq!(StreamFrame::Done.call_id(), None);
    }
}

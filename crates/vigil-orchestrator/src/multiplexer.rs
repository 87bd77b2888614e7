//! Result multiplexer.
//!
//! A cloneable sink over an unbounded channel. Producers never wait on each
//! other: text deltas and tool results are forwarded the moment they exist.
//! A closed channel means the client is gone, which cancels the request.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vigil_core::{FinishReason, StreamFrame, ToolInvocation};

/// Outgoing frame sink for one request.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    tx: mpsc::UnboundedSender<StreamFrame>,
    emitted: Arc<Mutex<HashSet<String>>>,
    cancel: CancellationToken,
}

impl Multiplexer {
    /// Create a sink and the receiving end the transport drains.
    #[must_use]
    pub fn new(cancel: CancellationToken) -> (Self, mpsc::UnboundedReceiver<StreamFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mux = Self {
            tx,
            emitted: Arc::new(Mutex::new(HashSet::new())),
            cancel,
        };
        (mux, rx)
    }

    /// The request's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the receiving side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, frame: StreamFrame) -> bool {
        if self.tx.send(frame).is_err() {
            if !self.cancel.is_cancelled() {
                warn!("client disconnected, cancelling request");
                self.cancel.cancel();
            }
            return false;
        }
        true
    }

    /// Forward a text delta.
    pub fn emit_text(&self, delta: &str) {
        if !delta.is_empty() {
            self.send(StreamFrame::Text {
                delta: delta.to_string(),
            });
        }
    }

    /// Announce a new tool call.
    pub fn emit_tool_call(&self, inv: &ToolInvocation) {
        self.send(StreamFrame::ToolCall {
            call_id: inv.call_id.clone(),
            tool_name: inv.tool_name.clone(),
            arguments: inv.arguments.clone(),
        });
    }

    /// Publish the terminal result of `call_id`.
    ///
    /// Returns `false` if a result for this call was already published.
    pub fn emit_tool_result(&self, call_id: &str, payload: &Value) -> bool {
        let first = self
            .emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call_id.to_string());
        if !first {
            debug!(call_id, "suppressing duplicate tool result");
            return false;
        }
        self.send(StreamFrame::ToolResult {
            call_id: call_id.to_string(),
            payload: payload.clone(),
        });
        true
    }

    /// Report why the loop stopped.
    pub fn emit_finish(&self, reason: FinishReason) {
        self.send(StreamFrame::Finish { reason });
    }

    /// Report a failure after streaming began.
    pub fn emit_error(&self, message: impl Into<String>) {
        self.send(StreamFrame::Error {
            message: message.into(),
        });
    }

    /// End the stream.
    pub fn emit_done(&self) {
        self.send(StreamFrame::Done);
    }
}

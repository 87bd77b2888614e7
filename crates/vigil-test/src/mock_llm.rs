//! Mock LLM provider for testing.
//!
//! [`MockLlmProvider`] replays pre-configured turns, one per call to
//! [`stream`](LlmProvider::stream), so the reasoning loop can be driven
//! deterministically.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use uuid::Uuid;

use vigil_llm::{
    LlmError, LlmProvider, LlmResult, LlmToolDefinition, Message, StreamBox, StreamEvent,
};

/// A single scripted turn.
#[derive(Debug, Clone)]
pub enum MockLlmTurn {
    /// Final text, streamed as one delta per chunk.
    Text(Vec<String>),
    /// Optional leading text, then tool calls.
    ToolCalls {
        /// Text streamed before the calls.
        text: Option<String>,
        /// The calls.
        calls: Vec<MockToolCall>,
    },
    /// An in-stream error.
    Error(String),
    /// A stream that never produces anything.
    Hang,
}

impl MockLlmTurn {
    /// A text turn delivered as a single delta.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(vec![text.into()])
    }

    /// A text turn delivered as several deltas.
    #[must_use]
    pub fn text_chunks(chunks: &[&str]) -> Self {
        Self::Text(chunks.iter().map(ToString::to_string).collect())
    }

    /// A tool-calls turn.
    #[must_use]
    pub fn tool_calls(calls: Vec<MockToolCall>) -> Self {
        Self::ToolCalls { text: None, calls }
    }

    /// Text followed by tool calls in the same step.
    #[must_use]
    pub fn text_then_calls(text: impl Into<String>, calls: Vec<MockToolCall>) -> Self {
        Self::ToolCalls {
            text: Some(text.into()),
            calls,
        }
    }

    /// An error turn.
    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }
}

/// One tool call in a [`MockLlmTurn::ToolCalls`].
#[derive(Debug, Clone)]
pub struct MockToolCall {
    /// Call id.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Arguments.
    pub arguments: Value,
}

impl MockToolCall {
    /// A call with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self::with_id(format!("mock-call-{}", Uuid::new_v4()), name, args)
    }

    /// A call with an explicit id.
    #[must_use]
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: args,
        }
    }
}

/// A deterministic, queue-based [`LlmProvider`].
///
/// Each call pops the next turn; an exhausted queue is an error. The messages,
/// tool names and system prompt of every call are captured.
pub struct MockLlmProvider {
    turns: Mutex<VecDeque<MockLlmTurn>>,
    calls: Mutex<Vec<CapturedCall>>,
}

/// What the loop sent on one call.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    /// Conversation.
    pub messages: Vec<Message>,
    /// Advertised tool names.
    pub tools: Vec<String>,
    /// System prompt.
    pub system: String,
}

impl MockLlmProvider {
    /// Provider preloaded with `turns`.
    #[must_use]
    pub fn new(turns: Vec<MockLlmTurn>) -> Self {
        Self {
            turns: Mutex::new(VecDeque::from(turns)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of `stream` calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock poisoned").len()
    }

    /// Snapshot of every captured call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn captured(&self) -> Vec<CapturedCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Messages of every call, in order.
    #[must_use]
    pub fn captured_messages(&self) -> Vec<Vec<Message>> {
        self.captured().into_iter().map(|c| c.messages).collect()
    }

    fn next_turn(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<MockLlmTurn> {
        self.calls.lock().expect("lock poisoned").push(CapturedCall {
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
            system: system.to_string(),
        });
        self.turns
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .ok_or_else(|| {
                LlmError::StreamingError("MockLlmProvider: no more turns queued".to_string())
            })
    }
}

#[async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<StreamBox> {
        let events: Vec<LlmResult<StreamEvent>> = match self.next_turn(messages, tools, system)? {
            MockLlmTurn::Text(chunks) => chunks
                .into_iter()
                .map(StreamEvent::TextDelta)
                .chain([StreamEvent::Done])
                .map(Ok)
                .collect(),
            MockLlmTurn::ToolCalls { text, calls } => {
                let mut evts: Vec<StreamEvent> = text.into_iter().map(StreamEvent::TextDelta).collect();
                for call in calls {
                    let args = serde_json::to_string(&call.arguments)
                        .unwrap_or_else(|_| "{}".to_string());
                    evts.push(StreamEvent::ToolCallStart {
                        id: call.id.clone(),
                        name: call.name,
                    });
                    evts.push(StreamEvent::ToolCallDelta {
                        id: call.id.clone(),
                        args_delta: args,
                    });
                    evts.push(StreamEvent::ToolCallEnd { id: call.id });
                }
                evts.push(StreamEvent::Usage {
                    input_tokens: 100,
                    output_tokens: 50,
                });
                evts.push(StreamEvent::Done);
                evts.into_iter().map(Ok).collect()
            },
            MockLlmTurn::Error(msg) => vec![Ok(StreamEvent::Error(msg))],
            MockLlmTurn::Hang => return Ok(Box::pin(stream::pending())),
        };

        Ok(Box::pin(stream::iter(events)))
    }
}

//! Incremental decoder for `OpenAI`-style chat-completion event streams.
//!
//! The HTTP body arrives in arbitrary chunks; [`ChatStreamDecoder`] buffers
//! until a blank line closes an SSE event, then turns each `data:` payload
//! into [`StreamEvent`]s. It is transport-free so it can be fed directly in
//! tests. Raw bytes go through [`ChatStreamDecoder::feed_bytes`], which holds
//! back a UTF-8 sequence cut by a chunk boundary until the rest arrives.

use bytes::BytesMut;
use serde::Deserialize;
use tracing::debug;

use crate::types::StreamEvent;

/// Stateful SSE decoder.
#[derive(Debug, Default)]
pub struct ChatStreamDecoder {
    buffer: String,
    partial: BytesMut,
    open_call: Option<String>,
    finished: bool,
}

impl ChatStreamDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event has been produced.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed raw body bytes.
    ///
    /// An incomplete character at the end of `chunk` is kept until the next
    /// call. Invalid sequences are replaced with U+FFFD.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.partial.extend_from_slice(chunk);
        let held = match std::str::from_utf8(&self.partial) {
            Err(e) if e.error_len().is_none() => {
                self.partial.len().saturating_sub(e.valid_up_to())
            },
            _ => 0,
        };
        let complete = self.partial.split_to(self.partial.len().saturating_sub(held));
        self.feed(&String::from_utf8_lossy(&complete))
    }

    /// Feed a chunk of the body and collect every event it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }
        self.buffer.push_str(&chunk.replace("\r\n", "\n"));

        while let Some(end) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..end).collect();
            self.buffer.replace_range(..2, "");

            for line in block.lines() {
                if let Some(data) = line.strip_prefix("data:") {
                    self.handle_data(data.trim(), &mut out);
                }
                if self.finished {
                    return out;
                }
            }
        }
        out
    }

    /// Flush at end of body: close any open call and emit `Done` once.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        if !self.finished {
            self.close_call(&mut out);
            self.finished = true;
            out.push(StreamEvent::Done);
        }
        out
    }

    fn close_call(&mut self, out: &mut Vec<StreamEvent>) {
        if let Some(id) = self.open_call.take() {
            out.push(StreamEvent::ToolCallEnd { id });
        }
    }

    fn handle_data(&mut self, data: &str, out: &mut Vec<StreamEvent>) {
        if data == "[DONE]" {
            out.extend(self.finish());
            return;
        }

        let chunk: ChunkPayload = match serde_json::from_str(data) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "skipping undecodable stream payload");
                return;
            },
        };

        for choice in &chunk.choices {
            if let Some(content) = choice.delta.content.as_deref()
                && !content.is_empty()
            {
                out.push(StreamEvent::TextDelta(content.to_string()));
            }

            for tc in choice.delta.tool_calls.iter().flatten() {
                let Some(function) = &tc.function else {
                    continue;
                };
                if tc.id.is_some() || self.open_call.is_none() {
                    self.close_call(out);
                    let id = tc
                        .id
                        .clone()
                        .unwrap_or_else(|| format!("call_{}", tc.index));
                    out.push(StreamEvent::ToolCallStart {
                        id: id.clone(),
                        name: function.name.clone().unwrap_or_default(),
                    });
                    self.open_call = Some(id);
                }
                if let Some(args) = &function.arguments
                    && let Some(id) = &self.open_call
                {
                    out.push(StreamEvent::ToolCallDelta {
                        id: id.clone(),
                        args_delta: args.clone(),
                    });
                }
            }

            if choice.finish_reason.is_some() {
                self.close_call(out);
            }
        }

        if let Some(usage) = &chunk.usage {
            out.push(StreamEvent::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<ChunkUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ChunkToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<ChunkFunction>,
}

#[derive(Debug, Deserialize)]
struct ChunkFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

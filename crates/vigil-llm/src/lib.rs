//! Vigil LLM - the reasoning-loop step provider.
//!
//! One call to [`LlmProvider::stream`] is one step of the reasoning loop: the
//! model sees the conversation so far and streams back text and tool calls.
//!
//! This crate provides:
//! - The [`LlmProvider`] trait and the [`StreamEvent`] vocabulary
//! - Provider-neutral message types ([`Message`], [`ToolCall`], [`ToolCallResult`])
//! - [`OpenAiCompatProvider`], a streaming client for `OpenAI`-compatible
//!   chat-completions endpoints

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod openai_compat;
pub mod provider;
pub mod sse;
pub mod types;

pub use error::{LlmError, LlmResult};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{LlmProvider, StreamBox};
pub use types::{
    LlmToolDefinition, Message, MessageContent, MessageRole, StreamEvent, ToolCall,
    ToolCallResult,
};

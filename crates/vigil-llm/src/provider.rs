//! LLM provider trait.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::LlmResult;
use crate::types::{LlmToolDefinition, Message, StreamEvent};

/// Type alias for boxed event streams.
pub type StreamBox = Pin<Box<dyn Stream<Item = LlmResult<StreamEvent>> + Send>>;

/// A model that can take one reasoning step.
///
/// Implementors stream text and tool calls for the given conversation. They
/// never execute tools themselves.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Stream one completion.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<StreamBox>;
}

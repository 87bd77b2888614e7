//! `OpenAI`-compatible streaming provider.
//!
//! Works with the `OpenAI` API and any endpoint that speaks the same
//! chat-completions dialect (vLLM, LM Studio, Ollama).

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::{LlmError, LlmResult};
use crate::provider::{LlmProvider, StreamBox};
use crate::sse::ChatStreamDecoder;
use crate::types::{LlmToolDefinition, Message, MessageContent, MessageRole};

/// Default `OpenAI` chat-completions endpoint.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

const PROVIDER_NAME: &str = "openai-compat";

/// Streaming client for `OpenAI`-compatible chat completions.
pub struct OpenAiCompatProvider {
    client: Client,
    model: String,
    max_tokens: usize,
    temperature: f64,
    url: String,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    /// Provider for the public `OpenAI` API.
    #[must_use]
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self::custom(DEFAULT_OPENAI_URL, Some(api_key), model)
    }

    /// Provider for an arbitrary compatible endpoint.
    ///
    /// `url` is the full chat-completions URL.
    #[must_use]
    pub fn custom(url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            model: model.to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            url: url.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(ToString::to_string),
        }
    }

    /// Set max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> Value {
        let mut wire = Vec::with_capacity(messages.len().saturating_add(1));
        if !system.is_empty() {
            wire.push(json!({"role": "system", "content": system}));
        }
        wire.extend(messages.iter().map(convert_message));

        let mut request = json!({
            "model": self.model,
            "messages": wire,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": true,
            "stream_options": {"include_usage": true}
        });

        if !tools.is_empty() {
            let wire_tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    // Strict endpoints reject a schema without `properties`.
                    let mut parameters = t.input_schema.clone();
                    if let Some(obj) = parameters.as_object_mut() {
                        obj.entry("properties").or_insert_with(|| json!({}));
                    }
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": parameters
                        }
                    })
                })
                .collect();
            request["tools"] = Value::Array(wire_tools);
        }

        request
    }

    fn auth_header(&self) -> LlmResult<Option<HeaderValue>> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };
        let mut value = HeaderValue::try_from(format!("Bearer {key}"))
            .map_err(|e| LlmError::ApiRequestFailed(format!("Invalid API key characters: {e}")))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}

fn convert_message(msg: &Message) -> Value {
    match &msg.content {
        MessageContent::Text(text) => {
            let role = match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            };
            json!({"role": role, "content": text})
        },
        MessageContent::ToolCalls(calls) => {
            let wire_calls: Vec<Value> = calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string()
                        }
                    })
                })
                .collect();
            json!({"role": "assistant", "content": Value::Null, "tool_calls": wire_calls})
        },
        MessageContent::ToolResult(result) => json!({
            "role": "tool",
            "tool_call_id": result.call_id,
            "content": result.content
        }),
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
    ) -> LlmResult<StreamBox> {
        if self.api_key.is_none() && !is_local_url(&self.url) {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        let body = self.build_request(messages, tools, system);
        debug!(model = %self.model, url = %self.url, "starting chat-completions stream");

        let mut request = self.client.post(&self.url).header(CONTENT_TYPE, "application/json");
        if let Some(auth) = self.auth_header()? {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            error!(status, body = %text, "chat-completions request rejected");
            return Err(LlmError::InvalidResponse(format!("HTTP {status}: {text}")));
        }

        let stream = try_stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = ChatStreamDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| LlmError::StreamingError(e.to_string()))?;
                for event in decoder.feed_bytes(&chunk) {
                    yield event;
                }
                if decoder.is_finished() {
                    return;
                }
            }
            for event in decoder.finish() {
                yield event;
            }
        };

        Ok(Box::pin(stream))
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("model", &self.model)
            .field("url", &self.url)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

/// Whether a URL points at the local machine, where keys are usually not needed.
fn is_local_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("localhost") || lower.contains("127.0.0.1") || lower.contains("[::1]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StreamEvent, ToolCall, ToolCallResult};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_request_with_system_and_tools() {
        let provider = OpenAiCompatProvider::openai("sk-test", "gpt-4o");
        let tools = vec![LlmToolDefinition::new("getStockQuote").with_description("quote")];
        let request = provider.build_request(&[Message::user("Hi")], &tools, "Be polite");

        assert_eq!(request["model"], "gpt-4o");
        assert_eq!(request["stream"], true);
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["content"], "Hi");
        assert_eq!(request["tools"][0]["function"]["name"], "getStockQuote");
        assert!(request["tools"][0]["function"]["parameters"]["properties"].is_object());
    }

    #[test]
    fn test_tool_messages_conversion() {
        let calls = Message::assistant_with_tools(vec![
            ToolCall::new("c1", "getStockQuote").with_arguments(json!({"symbol": "AAPL"})),
        ]);
        let converted = convert_message(&calls);
        assert_eq!(converted["tool_calls"][0]["id"], "c1");
        assert_eq!(
            converted["tool_calls"][0]["function"]["arguments"],
            r#"{"symbol":"AAPL"}"#
        );

        let result = convert_message(&Message::tool_result(ToolCallResult::from_payload(
            "c1",
            &json!({"success": true}),
        )));
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "c1");
    }

    #[tokio::test]
    async fn test_missing_key_for_remote_endpoint() {
        let provider = OpenAiCompatProvider::custom("https://example.com/v1/chat", None, "m");
        let Err(err) = provider.stream(&[], &[], "").await else {
            panic!("expected error");
        };
        assert!(matches!(err, LlmError::ApiKeyNotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_invalid_api_key_characters() {
        let provider = OpenAiCompatProvider::openai("invalid\nkey", "gpt-4o");
        let Err(err) = provider.stream(&[], &[], "").await else {
            panic!("expected error");
        };
        assert!(
            matches!(err, LlmError::ApiRequestFailed(ref msg) if msg.contains("Invalid API key characters"))
        );
    }

    #[tokio::test]
    async fn test_streams_text_from_server() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"AAPL is \"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"up.\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n"
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-local"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let url = format!("{}/v1/chat/completions", server.uri());
        let provider = OpenAiCompatProvider::custom(&url, Some("sk-local"), "gpt-4o");
        let stream = provider.stream(&[Message::user("AAPL?")], &[], "").await.unwrap();
        let events: Vec<StreamEvent> = stream.map(Result::unwrap).collect().await;

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("AAPL is ".into()),
                StreamEvent::TextDelta("up.".into()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::custom(&server.uri(), Some("k"), "gpt-4o");
        let Err(err) = provider.stream(&[], &[], "").await else {
            panic!("expected error");
        };
        assert!(matches!(err, LlmError::InvalidResponse(ref msg) if msg.contains("429")));
    }
}

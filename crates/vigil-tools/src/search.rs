//! Web search over a Tavily-compatible endpoint.

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::{Tool, ToolContext, ToolError, ToolResult, parse_args};

/// Default search endpoint.
pub(crate) const DEFAULT_SEARCH_URL: &str = "https://api.tavily.com/search";

const FAILED: &str = "Failed to perform web search";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// `webSearch`: searches the web for stock and financial information.
#[derive(Clone)]
pub struct WebSearchTool {
    http: Client,
    url: String,
    api_key: Option<String>,
}

impl WebSearchTool {
    /// Tool posting to `url` with `api_key` as bearer token.
    #[must_use]
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Tool for the default endpoint.
    #[must_use]
    pub fn with_default_url(api_key: Option<String>) -> Self {
        Self::new(DEFAULT_SEARCH_URL, api_key)
    }

    async fn search(&self, query: &str) -> Result<Value, String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "search API key is not configured".to_string())?;
        let mut auth = HeaderValue::try_from(format!("Bearer {key}")).map_err(|e| e.to_string())?;
        auth.set_sensitive(true);

        let response = self
            .http
            .post(&self.url)
            .header(AUTHORIZATION, auth)
            .json(&json!({"query": query}))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!(
                "Search API request failed with status {}",
                response.status().as_u16()
            ));
        }
        let body: Value = response.json().await.map_err(|e| e.to_string())?;
        Ok(body.get("results").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "webSearch"
    }

    fn description(&self) -> &str {
        "Searches the web for information about stocks and financial data"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The search query"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let SearchArgs { query } = parse_args(args)?;
        match ctx.cancellable(self.search(&query)).await? {
            Ok(results) => Ok(json!({"success": true, "results": results})),
            Err(e) => {
                warn!(error = %e, "web search failed");
                Err(ToolError::Failed(FAILED.into()))
            },
        }
    }
}

impl std::fmt::Debug for WebSearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSearchTool")
            .field("url", &self.url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_posts_query_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer tv-key"))
            .and(body_json(json!({"query": "AAPL news"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [{"title": "Apple up"}], "answer": null})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(server.uri(), Some("tv-key".into()));
        let out = tool
            .execute(json!({"query": "AAPL news"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(
            out,
            json!({"success": true, "results": [{"title": "Apple up"}]})
        );
    }

    #[tokio::test]
    async fn test_search_failure_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(server.uri(), Some("bad".into()));
        let err = tool
            .execute(json!({"query": "x"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to perform web search");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let tool = WebSearchTool::new("http://127.0.0.1:9", None);
        let err = tool
            .execute(json!({"query": "x"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Failed(FAILED.into()));
    }
}

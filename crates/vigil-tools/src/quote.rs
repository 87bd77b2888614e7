//! Quote and company-profile lookups.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::market::MarketDataClient;
use crate::{Tool, ToolContext, ToolResult, parse_args};

#[derive(Debug, Deserialize)]
struct SymbolArgs {
    symbol: String,
}

pub(crate) fn symbol_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "symbol": {
                "type": "string",
                "description": "Stock symbol (e.g., AAPL, MSFT)"
            }
        },
        "required": ["symbol"]
    })
}

/// `getStockQuote`: current quote for a symbol.
#[derive(Debug, Clone)]
pub struct StockQuoteTool {
    market: Arc<MarketDataClient>,
}

impl StockQuoteTool {
    /// Create the tool over a shared client.
    #[must_use]
    pub fn new(market: Arc<MarketDataClient>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for StockQuoteTool {
    fn name(&self) -> &str {
        "getStockQuote"
    }

    fn description(&self) -> &str {
        "Gets current stock quote information for a symbol"
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let SymbolArgs { symbol } = parse_args(args)?;
        let data = self
            .market
            .fetch_first(
                &format!("quote/{symbol}"),
                ctx,
                format!("No quote found for symbol {symbol}"),
                "Failed to fetch stock quote",
            )
            .await?;
        Ok(json!({"success": true, "data": data}))
    }
}

/// `getCompanyProfile`: company profile for a symbol.
#[derive(Debug, Clone)]
pub struct CompanyProfileTool {
    market: Arc<MarketDataClient>,
}

impl CompanyProfileTool {
    /// Create the tool over a shared client.
    #[must_use]
    pub fn new(market: Arc<MarketDataClient>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for CompanyProfileTool {
    fn name(&self) -> &str {
        "getCompanyProfile"
    }

    fn description(&self) -> &str {
        "Gets detailed company profile information for a stock symbol"
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let SymbolArgs { symbol } = parse_args(args)?;
        let data = self
            .market
            .fetch_first(
                &format!("profile/{symbol}"),
                ctx,
                format!("No company profile found for symbol {symbol}"),
                "Failed to fetch company profile",
            )
            .await?;
        Ok(json!({"success": true, "data": data}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn market(server: &MockServer) -> Arc<MarketDataClient> {
        Arc::new(MarketDataClient::new(server.uri(), Some("k".into())))
    }

    #[tokio::test]
    async fn test_quote_success_returns_first_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"symbol": "AAPL", "price": 190.1},
                {"symbol": "IGNORED"}
            ])))
            .mount(&server)
            .await;

        let tool = StockQuoteTool::new(market(&server).await);
        let out = tool
            .execute(json!({"symbol": "AAPL"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, json!({"success": true, "data": {"symbol": "AAPL", "price": 190.1}}));
    }

    #[tokio::test]
    async fn test_quote_empty_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let tool = StockQuoteTool::new(market(&server).await);
        let err = tool
            .execute(json!({"symbol": "ZZZZ"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No quote found for symbol ZZZZ");
    }

    #[tokio::test]
    async fn test_profile_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tool = CompanyProfileTool::new(market(&server).await);
        let err = tool
            .execute(json!({"symbol": "AAPL"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Failed("Failed to fetch company profile".into()));
    }

    #[tokio::test]
    async fn test_missing_symbol() {
        let tool = StockQuoteTool::new(Arc::new(MarketDataClient::new("http://localhost", None)));
        let err = tool.execute(json!({}), &ToolContext::default()).await;
        assert!(matches!(err, Err(ToolError::InvalidArguments(_))));
    }
}

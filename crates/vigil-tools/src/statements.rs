//! Financial statement lookups.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::market::MarketDataClient;
use crate::quote::symbol_schema;
use crate::{Tool, ToolContext, ToolResult, parse_args};

/// Kind of financial statement, named as the upstream path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatementType {
    /// `balance-sheet-statement`
    BalanceSheetStatement,
    /// `income-statement`
    IncomeStatement,
    /// `cash-flow-statement`
    CashFlowStatement,
}

impl StatementType {
    /// Every statement type, in schema order.
    pub const ALL: [Self; 3] = [
        Self::BalanceSheetStatement,
        Self::IncomeStatement,
        Self::CashFlowStatement,
    ];

    /// Upstream path segment.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BalanceSheetStatement => "balance-sheet-statement",
            Self::IncomeStatement => "income-statement",
            Self::CashFlowStatement => "cash-flow-statement",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementArgs {
    symbol: String,
    statement_type: StatementType,
}

#[derive(Debug, Deserialize)]
struct SymbolOnly {
    symbol: String,
}

/// Statement lookup.
///
/// Unfixed it is `getFinancialStatements` and takes a `statementType`
/// argument; fixed it is one of the single-statement shorthands.
#[derive(Debug, Clone)]
pub struct FinancialStatementsTool {
    market: Arc<MarketDataClient>,
    fixed: Option<StatementType>,
}

impl FinancialStatementsTool {
    /// The general tool.
    #[must_use]
    pub fn new(market: Arc<MarketDataClient>) -> Self {
        Self {
            market,
            fixed: None,
        }
    }

    /// A shorthand bound to one statement type.
    #[must_use]
    pub fn fixed(market: Arc<MarketDataClient>, statement: StatementType) -> Self {
        Self {
            market,
            fixed: Some(statement),
        }
    }
}

#[async_trait::async_trait]
impl Tool for FinancialStatementsTool {
    fn name(&self) -> &str {
        match self.fixed {
            None => "getFinancialStatements",
            Some(StatementType::BalanceSheetStatement) => "getBalanceSheet",
            Some(StatementType::IncomeStatement) => "getIncomeStatement",
            Some(StatementType::CashFlowStatement) => "getCashFlowStatement",
        }
    }

    fn description(&self) -> &str {
        match self.fixed {
            None => {
                "Gets financial statements (balance sheet, income statement, or cash flow statement) for a company"
            },
            Some(StatementType::BalanceSheetStatement) => {
                "Gets balance sheet statement for a company"
            },
            Some(StatementType::IncomeStatement) => "Gets income statement for a company",
            Some(StatementType::CashFlowStatement) => "Gets cash flow statement for a company",
        }
    }

    fn input_schema(&self) -> Value {
        if self.fixed.is_some() {
            return symbol_schema();
        }
        let kinds: Vec<&str> = StatementType::ALL.iter().map(|s| s.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Stock symbol (e.g., AAPL, MSFT)"
                },
                "statementType": {
                    "type": "string",
                    "enum": kinds,
                    "description": "Type of financial statement to retrieve"
                }
            },
            "required": ["symbol", "statementType"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let (symbol, statement) = match self.fixed {
            Some(statement) => {
                let SymbolOnly { symbol } = parse_args(args)?;
                (symbol, statement)
            },
            None => {
                let StatementArgs {
                    symbol,
                    statement_type,
                } = parse_args(args)?;
                (symbol, statement_type)
            },
        };

        let data = self
            .market
            .fetch_list(
                &format!("{statement}/{symbol}"),
                ctx,
                format!("No {statement} found for symbol {symbol}"),
                &format!("Failed to fetch {statement}"),
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

    #[tokio::test]
    async fn test_general_tool_returns_whole_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/income-statement/MSFT"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"year": 2024}, {"year": 2023}])),
            )
            .mount(&server)
            .await;

        let market = Arc::new(MarketDataClient::new(server.uri(), Some("k".into())));
        let tool = FinancialStatementsTool::new(market);
        let out = tool
            .execute(
                json!({"symbol": "MSFT", "statementType": "income-statement"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(out["data"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_shorthand_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cash-flow-statement/ABC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let market = Arc::new(MarketDataClient::new(server.uri(), Some("k".into())));
        let tool = FinancialStatementsTool::fixed(market, StatementType::CashFlowStatement);
        assert_eq!(tool.name(), "getCashFlowStatement");

        let err = tool
            .execute(json!({"symbol": "ABC"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No cash-flow-statement found for symbol ABC");
    }

    #[tokio::test]
    async fn test_unknown_statement_type() {
        let market = Arc::new(MarketDataClient::new("http://localhost", Some("k".into())));
        let err = FinancialStatementsTool::new(market)
            .execute(
                json!({"symbol": "ABC", "statementType": "tax-return"}),
                &ToolContext::default(),
            )
            .await;
        assert!(matches!(err, Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn test_schema_lists_statement_types() {
        let market = Arc::new(MarketDataClient::with_default_url(None));
        let schema = FinancialStatementsTool::new(market).input_schema();
        assert_eq!(
            schema["properties"]["statementType"]["enum"],
            json!(["balance-sheet-statement", "income-statement", "cash-flow-statement"])
        );
    }
}

//! The closed set of built-in stock-advisor tools.

use std::sync::Arc;

use serde_json::Value;
use vigil_storage::OrderStore;

use crate::market::MarketDataClient;
use crate::orders::CreateStockOrderTool;
use crate::portfolio::PortfolioPositionsTool;
use crate::quote::{CompanyProfileTool, StockQuoteTool};
use crate::search::WebSearchTool;
use crate::statements::{FinancialStatementsTool, StatementType};
use crate::{Tool, ToolContext, ToolRegistry, ToolResult};

/// One built-in tool.
#[derive(Debug, Clone)]
pub enum StockTool {
    /// `getStockQuote`
    Quote(StockQuoteTool),
    /// `getCompanyProfile`
    Profile(CompanyProfileTool),
    /// `getFinancialStatements` and its shorthands
    Statements(FinancialStatementsTool),
    /// `webSearch`
    WebSearch(WebSearchTool),
    /// `getPortfolioPositions`
    Portfolio(PortfolioPositionsTool),
    /// `createStockOrder` / `createStockOrderWithConfirmation`
    CreateOrder(CreateStockOrderTool),
}

impl StockTool {
    fn inner(&self) -> &dyn Tool {
        match self {
            Self::Quote(t) => t,
            Self::Profile(t) => t,
            Self::Statements(t) => t,
            Self::WebSearch(t) => t,
            Self::Portfolio(t) => t,
            Self::CreateOrder(t) => t,
        }
    }
}

#[async_trait::async_trait]
impl Tool for StockTool {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn description(&self) -> &str {
        self.inner().description()
    }

    fn input_schema(&self) -> Value {
        self.inner().input_schema()
    }

    fn requires_confirmation(&self) -> bool {
        self.inner().requires_confirmation()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        self.inner().execute(args, ctx).await
    }
}

/// How order creation is exposed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    /// `createStockOrder`, executed without asking.
    Auto,
    /// `createStockOrderWithConfirmation`, gated behind a human decision.
    Confirmed,
}

/// Shared collaborators from which the built-in tools are assembled.
#[derive(Clone)]
pub struct StockToolset {
    market: Arc<MarketDataClient>,
    search: WebSearchTool,
    store: Arc<dyn OrderStore>,
}

impl StockToolset {
    /// Assemble from a market-data client, a search tool and an order store.
    #[must_use]
    pub fn new(market: MarketDataClient, search: WebSearchTool, store: Arc<dyn OrderStore>) -> Self {
        Self {
            market: Arc::new(market),
            search,
            store,
        }
    }

    /// The order store the order tools write to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    /// Every built-in tool for the given order mode.
    #[must_use]
    pub fn tools(&self, mode: OrderMode) -> Vec<StockTool> {
        let market = &self.market;
        let order = match mode {
            OrderMode::Auto => CreateStockOrderTool::auto(Arc::clone(&self.store)),
            OrderMode::Confirmed => CreateStockOrderTool::with_confirmation(Arc::clone(&self.store)),
        };

        let mut tools = vec![
            StockTool::Quote(StockQuoteTool::new(Arc::clone(market))),
            StockTool::Profile(CompanyProfileTool::new(Arc::clone(market))),
            StockTool::Statements(FinancialStatementsTool::new(Arc::clone(market))),
        ];
        tools.extend(StatementType::ALL.into_iter().map(|s| {
            StockTool::Statements(FinancialStatementsTool::fixed(Arc::clone(market), s))
        }));
        tools.push(StockTool::WebSearch(self.search.clone()));
        tools.push(StockTool::Portfolio(PortfolioPositionsTool::new(
            Arc::clone(&self.store),
            Arc::clone(market),
        )));
        tools.push(StockTool::CreateOrder(order));
        tools
    }

    /// A registry holding [`tools`](Self::tools).
    #[must_use]
    pub fn registry(&self, mode: OrderMode) -> ToolRegistry {
        self.tools(mode)
            .into_iter()
            .fold(ToolRegistry::new(), |reg, tool| reg.with(Arc::new(tool)))
    }
}

impl std::fmt::Debug for StockToolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockToolset")
            .field("market", &self.market)
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_storage::MemoryOrderStore;

    fn toolset() -> StockToolset {
        StockToolset::new(
            MarketDataClient::with_default_url(None),
            WebSearchTool::with_default_url(None),
            Arc::new(MemoryOrderStore::new()),
        )
    }

    #[test]
    fn test_confirmed_registry() {
        let registry = toolset().registry(OrderMode::Confirmed);
        assert_eq!(
            registry.names(),
            vec![
                "createStockOrderWithConfirmation",
                "getBalanceSheet",
                "getCashFlowStatement",
                "getCompanyProfile",
                "getFinancialStatements",
                "getIncomeStatement",
                "getPortfolioPositions",
                "getStockQuote",
                "webSearch",
            ]
        );
        assert!(registry.requires_confirmation("createStockOrderWithConfirmation"));
        assert!(!registry.requires_confirmation("getStockQuote"));
    }

    #[test]
    fn test_auto_registry_has_no_confirmation_tools() {
        let registry = toolset().registry(OrderMode::Auto);
        assert!(registry.get("createStockOrder").is_some());
        assert!(registry.get("createStockOrderWithConfirmation").is_none());
        assert!(
            registry
                .names()
                .iter()
                .all(|n| !registry.requires_confirmation(n))
        );
    }
}

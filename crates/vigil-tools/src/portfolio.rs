//! Portfolio positions with mark-to-market valuation.

// Money math is f64 and cannot overflow in a way that traps.
#![allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use vigil_storage::{OrderStore, OrderType, StockOrder};

use crate::market::{FetchError, MarketDataClient};
use crate::{Tool, ToolContext, ToolError, ToolResult, parse_args};

const FAILED: &str = "Failed to calculate portfolio positions";
const PRICE_ERROR: &str = "Could not retrieve current price";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioArgs {
    #[serde(default)]
    user_id: Option<String>,
}

/// Net holding in one symbol, derived from the order history.
#[derive(Debug, Clone, PartialEq)]
struct Holding {
    symbol: String,
    net_quantity: i64,
    cost_basis: f64,
    total_cost: f64,
}

impl Holding {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            net_quantity: 0,
            cost_basis: 0.0,
            total_cost: 0.0,
        }
    }

    fn buy(&mut self, quantity: i64, price: f64) {
        self.total_cost += quantity as f64 * price;
        self.net_quantity = self.net_quantity.saturating_add(quantity);
        self.cost_basis = if self.net_quantity > 0 {
            self.total_cost / self.net_quantity as f64
        } else {
            0.0
        };
    }

    fn sell(&mut self, quantity: i64) {
        self.net_quantity = self.net_quantity.saturating_sub(quantity);
        if self.net_quantity <= 0 {
            self.total_cost = 0.0;
            self.cost_basis = 0.0;
        } else {
            self.total_cost = self.cost_basis * self.net_quantity as f64;
        }
    }
}

/// Aggregate orders by symbol in first-seen order, dropping flat positions.
fn holdings_from_orders(orders: &[StockOrder]) -> Vec<Holding> {
    let mut holdings: Vec<Holding> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for order in orders {
        let idx = *index.entry(order.symbol.as_str()).or_insert_with(|| {
            holdings.push(Holding::new(&order.symbol));
            holdings.len().saturating_sub(1)
        });
        let quantity = i64::try_from(order.quantity).unwrap_or(i64::MAX);
        let holding = &mut holdings[idx];
        match order.order_type {
            OrderType::Buy => holding.buy(quantity, order.price),
            OrderType::Sell => holding.sell(quantity),
        }
    }
    holdings.retain(|h| h.net_quantity != 0);
    holdings
}

/// A holding valued at the current market price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Position {
    symbol: String,
    net_quantity: i64,
    cost_basis: f64,
    total_cost: f64,
    current_price: Option<f64>,
    market_value: Option<f64>,
    mtm_value: Option<f64>,
    mtm_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_profit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_error: Option<String>,
}

impl Position {
    fn valued(h: Holding, price: f64) -> Self {
        let market_value = h.net_quantity as f64 * price;
        let mtm_value = market_value - h.total_cost;
        let mtm_percentage = if h.total_cost > 0.0 {
            mtm_value / h.total_cost * 100.0
        } else {
            0.0
        };
        Self {
            symbol: h.symbol,
            net_quantity: h.net_quantity,
            cost_basis: h.cost_basis,
            total_cost: h.total_cost,
            current_price: Some(price),
            market_value: Some(market_value),
            mtm_value: Some(mtm_value),
            mtm_percentage: Some(mtm_percentage),
            is_profit: Some(mtm_value >= 0.0),
            price_error: None,
        }
    }

    fn unpriced(h: Holding) -> Self {
        Self {
            symbol: h.symbol,
            net_quantity: h.net_quantity,
            cost_basis: h.cost_basis,
            total_cost: h.total_cost,
            current_price: None,
            market_value: None,
            mtm_value: None,
            mtm_percentage: None,
            is_profit: None,
            price_error: Some(PRICE_ERROR.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    total_investment: f64,
    total_market_value: f64,
    total_mtm_value: f64,
    total_mtm_percentage: f64,
    is_profit: bool,
}

fn summarize(positions: &[Position]) -> Summary {
    let total_investment: f64 = positions.iter().map(|p| p.total_cost).sum();
    let total_market_value: f64 = positions
        .iter()
        .map(|p| p.market_value.unwrap_or(p.total_cost))
        .sum();
    let total_mtm_value = total_market_value - total_investment;
    let total_mtm_percentage = if total_investment > 0.0 {
        total_mtm_value / total_investment * 100.0
    } else {
        0.0
    };
    Summary {
        total_investment,
        total_market_value,
        total_mtm_value,
        total_mtm_percentage,
        is_profit: total_mtm_value >= 0.0,
    }
}

/// `getPortfolioPositions`: positions and P&L for a user.
#[derive(Clone)]
pub struct PortfolioPositionsTool {
    store: Arc<dyn OrderStore>,
    market: Arc<MarketDataClient>,
}

impl PortfolioPositionsTool {
    /// Create the tool.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, market: Arc<MarketDataClient>) -> Self {
        Self { store, market }
    }

    async fn value(&self, holding: Holding, ctx: &ToolContext) -> Result<Position, ToolError> {
        match self.market.price(&holding.symbol, ctx).await {
            Ok(price) => Ok(Position::valued(holding, price)),
            Err(FetchError::Cancelled) => Err(ToolError::Cancelled),
            Err(e) => {
                warn!(symbol = %holding.symbol, error = %e, "price lookup failed");
                Ok(Position::unpriced(holding))
            },
        }
    }
}

#[async_trait::async_trait]
impl Tool for PortfolioPositionsTool {
    fn name(&self) -> &str {
        "getPortfolioPositions"
    }

    fn description(&self) -> &str {
        "Gets current portfolio positions with mark-to-market valuation"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userId": {"type": "string", "description": "User ID to get positions for"}
            },
            "required": ["userId"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let PortfolioArgs { user_id } = parse_args(args)?;
        let user_id = ctx.resolve_user(user_id)?;

        let orders = self.store.get_by_user(&user_id).await.map_err(|e| {
            warn!(error = %e, "order lookup failed");
            ToolError::Failed(FAILED.into())
        })?;
        if orders.is_empty() {
            return Ok(json!({
                "success": true,
                "positions": [],
                "message": "No positions found for this user."
            }));
        }

        let holdings = holdings_from_orders(&orders);
        debug!(orders = orders.len(), holdings = holdings.len(), "valuing portfolio");

        let positions = join_all(holdings.into_iter().map(|h| self.value(h, ctx)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        let summary = summarize(&positions);

        Ok(json!({
            "success": true,
            "positions": positions,
            "summary": summary,
        }))
    }
}

impl std::fmt::Debug for PortfolioPositionsTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioPositionsTool")
            .field("market", &self.market)
            .finish_non_exhaustive()
    }
}

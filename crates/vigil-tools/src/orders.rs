//! Order creation, with and without human confirmation.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use vigil_storage::{NewOrder, OrderStore, OrderType};

use crate::{Tool, ToolContext, ToolError, ToolResult, parse_args};

const FAILED: &str = "Failed to create stock order";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderArgs {
    #[serde(default)]
    user_id: Option<String>,
    symbol: String,
    quantity: u64,
    price: f64,
    order_type: OrderType,
}

/// `createStockOrder` / `createStockOrderWithConfirmation`.
///
/// Both names share this executor; only the capability class differs.
#[derive(Clone)]
pub struct CreateStockOrderTool {
    store: Arc<dyn OrderStore>,
    confirm: bool,
}

impl CreateStockOrderTool {
    /// The auto-executing variant.
    #[must_use]
    pub fn auto(store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            confirm: false,
        }
    }

    /// The variant gated behind human confirmation.
    #[must_use]
    pub fn with_confirmation(store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            confirm: true,
        }
    }
}

#[async_trait::async_trait]
impl Tool for CreateStockOrderTool {
    fn name(&self) -> &str {
        if self.confirm {
            "createStockOrderWithConfirmation"
        } else {
            "createStockOrder"
        }
    }

    fn description(&self) -> &str {
        if self.confirm {
            "Creates a new stock order (BUY or SELL) for a specified stock symbol. \
             The user must approve the order before it is placed."
        } else {
            "Creates a new stock order (BUY or SELL) for a specified stock symbol"
        }
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "userId": {"type": "string", "description": "User ID making the order"},
                "symbol": {"type": "string", "description": "Stock symbol (e.g., AAPL, MSFT)"},
                "quantity": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Number of shares to buy or sell"
                },
                "price": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Price per share"
                },
                "orderType": {
                    "type": "string",
                    "enum": ["BUY", "SELL"],
                    "description": "Type of order (BUY or SELL)"
                }
            },
            "required": ["userId", "symbol", "quantity", "price", "orderType"]
        })
    }

    fn requires_confirmation(&self) -> bool {
        self.confirm
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let args: OrderArgs = parse_args(args)?;
        if args.quantity == 0 {
            return Err(ToolError::InvalidArguments("quantity must be positive".into()));
        }
        if !args.price.is_finite() || args.price <= 0.0 {
            return Err(ToolError::InvalidArguments("price must be positive".into()));
        }
        let user_id = ctx.resolve_user(args.user_id)?;

        // Last point at which a disconnect can still prevent the side effect.
        if ctx.cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let order = NewOrder {
            user_id,
            symbol: args.symbol,
            quantity: args.quantity,
            price: args.price,
            order_type: args.order_type,
        };
        let stored = self.store.create(order).await.map_err(|e| {
            warn!(error = %e, "order creation failed");
            ToolError::Failed(FAILED.into())
        })?;

        info!(order_id = %stored.id, symbol = %stored.symbol, "order created");
        Ok(json!({
            "success": true,
            "orderId": stored.id,
            "message": format!(
                "Successfully created {} order for {} shares of {} at ${} per share.",
                stored.order_type, stored.quantity, stored.symbol, stored.price
            ),
        }))
    }
}

impl std::fmt::Debug for CreateStockOrderTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateStockOrderTool")
            .field("confirm", &self.confirm)
            .finish_non_exhaustive()
    }
}

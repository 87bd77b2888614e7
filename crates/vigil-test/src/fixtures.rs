//! Trace and tool fixtures.

use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;
use vigil_core::{Message, ToolInvocation, Trace};
use vigil_tools::{Tool, ToolError, ToolRegistry};

use crate::tools::ScriptedTool;

/// Arguments of an order call.
#[must_use]
pub fn order_args(symbol: &str, quantity: u64, price: f64) -> Value {
    json!({"symbol": symbol, "quantity": quantity, "price": price})
}

/// A confirmation-required `placeOrder` tool answering like the order tool.
///
/// `orderType` defaults to `BUY` when the arguments omit it.
#[must_use]
pub fn place_order_tool() -> ScriptedTool {
    ScriptedTool::new("placeOrder")
        .requiring_confirmation()
        .with_handler(|args, _| {
            let invalid = |k: &str| ToolError::InvalidArguments(format!("{k} is required"));
            let symbol = args
                .get("symbol")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("symbol"))?;
            let quantity = args
                .get("quantity")
                .and_then(Value::as_u64)
                .ok_or_else(|| invalid("quantity"))?;
            let price = args
                .get("price")
                .and_then(Value::as_f64)
                .ok_or_else(|| invalid("price"))?;
            let order_type = args
                .get("orderType")
                .and_then(Value::as_str)
                .unwrap_or("BUY");
            Ok(json!({
                "success": true,
                "orderId": Uuid::new_v4().to_string(),
                "message": format!(
                    "Successfully created {order_type} order for {quantity} shares of {symbol} at ${price} per share."
                ),
            }))
        })
}

/// A trace of one user turn followed by an assistant message of `invocations`.
#[must_use]
pub fn pending_trace(invocations: Vec<ToolInvocation>) -> Trace {
    Trace::from(vec![
        Message::user("Buy 10 shares of AAPL at 150"),
        Message::assistant_invocations(invocations),
    ])
}

/// A registry holding `tools`.
#[must_use]
pub fn registry_with(tools: &[Arc<ScriptedTool>]) -> ToolRegistry {
    tools.iter().fold(ToolRegistry::new(), |reg, t| {
        reg.with(Arc::clone(t) as Arc<dyn Tool>)
    })
}

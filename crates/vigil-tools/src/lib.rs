#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Tools for the Vigil stock advisor.
//!
//! Every tool is a [`Tool`]: a name, an argument schema, a capability class
//! (auto-executing or confirmation-required) and an async executor. The
//! built-in set is the closed enum [`StockTool`]; the [`ToolRegistry`] maps
//! names to tools and exports their definitions for the model.

mod error;
mod market;
mod orders;
mod portfolio;
mod quote;
mod search;
mod statements;
mod stock;

pub use error::{ToolError, ToolResult};
pub use market::MarketDataClient;
pub use orders::CreateStockOrderTool;
pub use portfolio::PortfolioPositionsTool;
pub use quote::{CompanyProfileTool, StockQuoteTool};
pub use search::WebSearchTool;
pub use statements::{FinancialStatementsTool, StatementType};
pub use stock::{OrderMode, StockTool, StockToolset};

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use vigil_llm::LlmToolDefinition;

/// A tool the reasoning loop can call.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Registered name, as the model sees it.
    fn name(&self) -> &str;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// JSON schema for the arguments.
    fn input_schema(&self) -> Value;

    /// Whether a human must approve each call before it runs.
    fn requires_confirmation(&self) -> bool {
        false
    }

    /// Run the tool and return its success payload.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value>;
}

/// Per-request context handed to every executor.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Fires when the caller goes away.
    pub cancel: CancellationToken,
    /// Identity bound by the caller; wins over any model-supplied `userId`.
    pub user_id: Option<String>,
}

impl ToolContext {
    /// Context with the given cancellation token and no bound identity.
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            user_id: None,
        }
    }

    /// Bind a user identity.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// The bound identity, else the one from the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] when neither is present.
    pub fn resolve_user(&self, from_args: Option<String>) -> ToolResult<String> {
        self.user_id
            .clone()
            .or(from_args)
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("userId is required".into()))
    }

    /// Run `fut` unless the request is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Cancelled`] if the token fires first.
    pub async fn cancellable<F: Future>(&self, fut: F) -> ToolResult<F::Output> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ToolError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

/// Deserialize tool arguments into a typed struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Wraps a tool so every call runs with a fixed user identity.
///
/// Used as a per-call executor override when the caller binds who is acting.
pub struct UserBoundTool {
    inner: Arc<dyn Tool>,
    user_id: String,
}

impl UserBoundTool {
    /// Bind `user_id` to `inner`.
    pub fn new(inner: Arc<dyn Tool>, user_id: impl Into<String>) -> Self {
        Self {
            inner,
            user_id: user_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for UserBoundTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> Value {
        self.inner.input_schema()
    }

    fn requires_confirmation(&self) -> bool {
        self.inner.requires_confirmation()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let bound = ctx.clone().with_user(self.user_id.clone());
        self.inner.execute(args, &bound).await
    }
}

/// Name-keyed registry of tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Whether calls to `name` need a human decision. Unknown names do not.
    #[must_use]
    pub fn requires_confirmation(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .is_some_and(|t| t.requires_confirmation())
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Export all tool definitions for the model, sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<LlmToolDefinition> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| {
                LlmToolDefinition::new(t.name())
                    .with_description(t.description())
                    .with_schema(t.input_schema())
            })
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo {
        confirm: bool,
    }

    #[async_trait::async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            if self.confirm { "echoConfirmed" } else { "echo" }
        }

        fn description(&self) -> &str {
            "Echoes the caller"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        fn requires_confirmation(&self) -> bool {
            self.confirm
        }

        async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
            Ok(json!({"args": args, "user": ctx.user_id}))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(Echo { confirm: false }))
            .with(Arc::new(Echo { confirm: true }))
    }

    #[test]
    fn test_registry_lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("echo").is_some());
        assert!(registry.requires_confirmation("echoConfirmed"));
        assert!(!registry.requires_confirmation("echo"));
        assert!(!registry.requires_confirmation("nonexistent"));
    }

    #[test]
    fn test_definitions_are_sorted() {
        let defs = registry().definitions();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "echoConfirmed"]);
        assert_eq!(defs[0].description.as_deref(), Some("Echoes the caller"));
    }

    #[test]
    fn test_resolve_user_prefers_bound_identity() {
        let ctx = ToolContext::default().with_user("bound");
        assert_eq!(ctx.resolve_user(Some("model".into())).unwrap(), "bound");

        let ctx = ToolContext::default();
        assert_eq!(ctx.resolve_user(Some("model".into())).unwrap(), "model");
        assert!(matches!(
            ctx.resolve_user(None),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_user_bound_tool() {
        let bound = UserBoundTool::new(Arc::new(Echo { confirm: true }), "alice");
        assert!(bound.requires_confirmation());

        let out = bound
            .execute(json!({"x": 1}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out["user"], "alice");
        assert_eq!(out["args"]["x"], 1);
    }

    #[tokio::test]
    async fn test_cancellable() {
        let ctx = ToolContext::default();
        assert_eq!(ctx.cancellable(async { 7 }).await.unwrap(), 7);

        ctx.cancel.cancel();
        let pending = std::future::pending::<()>();
        assert_eq!(ctx.cancellable(pending).await, Err(ToolError::Cancelled));
    }
}

//! Scripted tools that count and record their invocations.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use vigil_tools::{Tool, ToolContext, ToolError, ToolResult};

type Handler = dyn Fn(&Value, &ToolContext) -> ToolResult<Value> + Send + Sync;

/// A [`Tool`] whose behaviour is fixed by the test.
///
/// Defaults: auto-executing, returns `{"success": true}`, no delay.
pub struct ScriptedTool {
    name: String,
    confirm: bool,
    delay: Option<Duration>,
    handler: Box<Handler>,
    invocations: AtomicUsize,
    recorded: Mutex<Vec<(Value, Option<String>)>>,
}

impl ScriptedTool {
    /// An auto-executing tool named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confirm: false,
            delay: None,
            handler: Box::new(|_, _| Ok(json!({"success": true}))),
            invocations: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Require human confirmation.
    #[must_use]
    pub fn requiring_confirmation(mut self) -> Self {
        self.confirm = true;
        self
    }

    /// Always return `payload`.
    #[must_use]
    pub fn returning(mut self, payload: Value) -> Self {
        self.handler = Box::new(move |_, _| Ok(payload.clone()));
        self
    }

    /// Always fail with `error`.
    #[must_use]
    pub fn failing(mut self, error: ToolError) -> Self {
        self.handler = Box::new(move |_, _| Err(error.clone()));
        self
    }

    /// Compute the result from the arguments and context.
    #[must_use]
    pub fn with_handler(
        mut self,
        handler: impl Fn(&Value, &ToolContext) -> ToolResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.handler = Box::new(handler);
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times the executor ran.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Arguments of every run, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn recorded_args(&self) -> Vec<Value> {
        self.recorded
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(a, _)| a.clone())
            .collect()
    }

    /// Bound user identity seen by every run, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn recorded_users(&self) -> Vec<Option<String>> {
        self.recorded
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(_, u)| u.clone())
            .collect()
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn description(&self) -> &str {
        "Scripted test tool"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn requires_confirmation(&self) -> bool {
        self.confirm
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.recorded
            .lock()
            .expect("lock poisoned")
            .push((args.clone(), ctx.user_id.clone()));
        if let Some(delay) = self.delay {
            ctx.cancellable(tokio::time::sleep(delay)).await?;
        }
        (self.handler)(&args, ctx)
    }
}

impl std::fmt::Debug for ScriptedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTool")
            .field("name", &self.name)
            .field("confirm", &self.confirm)
            .field("invocations", &self.invocations())
            .finish_non_exhaustive()
    }
}

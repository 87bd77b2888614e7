//! Resolution applier.
//!
//! Turns decided confirmation units (and, for the loop, auto units) into
//! terminal payloads. Units run concurrently; each payload is written into the
//! trace and published the moment its unit finishes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use vigil_core::{Decision, Message};
use vigil_tools::{Tool, ToolContext, ToolError, ToolRegistry};

use crate::multiplexer::Multiplexer;
use crate::scanner::ScanReport;

/// Payload written for a rejected call.
#[must_use]
pub fn cancellation_payload() -> Value {
    json!({"success": false, "message": "cancelled by user"})
}

/// Payload written for a failed call.
#[must_use]
pub fn failure_payload(error: &ToolError) -> Value {
    json!({"success": false, "error": error.to_string()})
}

/// Runs tools for one request: override lookup, timeout, logging.
pub struct ToolExecutor {
    registry: ToolRegistry,
    overrides: HashMap<String, Arc<dyn Tool>>,
    timeout: Duration,
    ctx: ToolContext,
}

impl ToolExecutor {
    /// Executor over `registry` with the per-request context.
    #[must_use]
    pub fn new(registry: ToolRegistry, timeout: Duration, ctx: ToolContext) -> Self {
        Self {
            registry,
            overrides: HashMap::new(),
            timeout,
            ctx,
        }
    }

    /// Per-call executor replacements, keyed by call id.
    #[must_use]
    pub fn with_overrides(mut self, overrides: HashMap<String, Arc<dyn Tool>>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Run one call to completion. Never fails: errors become failure payloads.
    pub async fn run(&self, call_id: &str, tool_name: &str, args: Value) -> Value {
        let tool = self
            .overrides
            .get(call_id)
            .cloned()
            .or_else(|| self.registry.get(tool_name));
        let Some(tool) = tool else {
            warn!(call_id, tool = tool_name, "call to unregistered tool");
            return json!({"success": false, "error": format!("Unknown tool: {tool_name}")});
        };

        let started = Instant::now();
        debug!(call_id, tool = tool_name, "executing tool");
        let outcome = tokio::time::timeout(self.timeout, tool.execute(args, &self.ctx)).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(Ok(payload)) => {
                info!(call_id, tool = tool_name, elapsed_ms, "tool finished");
                payload
            },
            Ok(Err(e)) => {
                warn!(call_id, tool = tool_name, elapsed_ms, error = %e, "tool failed");
                failure_payload(&e)
            },
            Err(_) => {
                let secs = self.timeout.as_secs();
                warn!(call_id, tool = tool_name, timeout_secs = secs, "tool timed out");
                failure_payload(&ToolError::Timeout(secs))
            },
        }
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("registry", &self.registry)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// What to do with one unit.
enum Action {
    Execute { tool_name: String, args: Value },
    Cancel,
}

struct Job {
    index: usize,
    call_id: String,
    action: Action,
}

/// Applies decisions and runs pending calls against the last message.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionApplier<'a> {
    executor: &'a ToolExecutor,
    mux: &'a Multiplexer,
}

impl<'a> ResolutionApplier<'a> {
    /// Applier writing through `mux`.
    #[must_use]
    pub fn new(executor: &'a ToolExecutor, mux: &'a Multiplexer) -> Self {
        Self { executor, mux }
    }

    /// Resolve every decided confirmation unit of the report.
    ///
    /// Approved units run their executor; rejected units get the cancellation
    /// payload without touching any executor. Undecided units are left alone.
    /// Returns the number of units resolved.
    pub async fn apply_decisions(&self, message: &mut Message, report: &ScanReport) -> usize {
        let jobs = report
            .decided()
            .filter_map(|(pending, decision)| {
                let inv = message.units.get(pending.index)?.as_invocation()?;
                let action = match decision {
                    Decision::Approve => Action::Execute {
                        tool_name: inv.tool_name.clone(),
                        args: inv.arguments.clone(),
                    },
                    Decision::Reject => Action::Cancel,
                };
                Some(Job {
                    index: pending.index,
                    call_id: pending.call_id.clone(),
                    action,
                })
            })
            .collect();
        self.resolve(message, jobs).await
    }

    /// Run the auto units at `indices`.
    pub async fn run_auto(&self, message: &mut Message, indices: &[usize]) -> usize {
        let jobs = indices
            .iter()
            .filter_map(|&index| {
                let inv = message.units.get(index)?.as_invocation()?;
                Some(Job {
                    index,
                    call_id: inv.call_id.clone(),
                    action: Action::Execute {
                        tool_name: inv.tool_name.clone(),
                        args: inv.arguments.clone(),
                    },
                })
            })
            .collect();
        self.resolve(message, jobs).await
    }

    async fn resolve(&self, message: &mut Message, jobs: Vec<Job>) -> usize {
        let executor = self.executor;
        let mut in_flight: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|job| async move {
                let payload = match job.action {
                    Action::Execute { tool_name, args } => {
                        executor.run(&job.call_id, &tool_name, args).await
                    },
                    Action::Cancel => {
                        debug!(call_id = %job.call_id, "call rejected by user");
                        cancellation_payload()
                    },
                };
                (job.index, job.call_id, payload)
            })
            .collect();

        let mut resolved = 0usize;
        while let Some((index, call_id, payload)) = in_flight.next().await {
            self.mux.emit_tool_result(&call_id, &payload);
            if let Some(inv) = message
                .units
                .get_mut(index)
                .and_then(vigil_core::Unit::as_invocation_mut)
            {
                inv.resolve(payload);
                resolved = resolved.saturating_add(1);
            }
        }
        resolved
    }
}

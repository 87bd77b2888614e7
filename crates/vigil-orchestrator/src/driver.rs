//! Orchestration driver.
//!
//! Runs the scanner and the applier over the incoming trace, then advances the
//! reasoning loop as an explicit state machine:
//!
//! ```text
//! Generating ──calls, all resolved──▶ Generating
//!     │  │
//!     │  └──calls, some unresolved──▶ AwaitingTools ──▶ (stop)
//!     ├──final text──────────────────▶ Done ──────────▶ (stop)
//!     └──step bound reached──────────▶ Exhausted ─────▶ (stop)
//! ```
//!
//! Every stop emits a `finish` frame followed by `done`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use vigil_core::{Decision, FinishReason, Message, Role, ToolInvocation, Trace, Unit};
use vigil_llm::{LlmError, LlmProvider, StreamEvent};
use vigil_tools::{Tool, ToolContext, ToolRegistry, UserBoundTool};

use crate::applier::{ResolutionApplier, ToolExecutor};
use crate::config::OrchestratorConfig;
use crate::convert::to_provider_messages;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::multiplexer::Multiplexer;
use crate::prompt::ADVISOR_PROMPT;
use crate::scanner::{ScanReport, scan};

/// Per-request inputs besides the trace.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Fresh decisions keyed by call id.
    pub decisions: HashMap<String, Decision>,
    /// Executor replacements keyed by call id.
    pub overrides: HashMap<String, Arc<dyn Tool>>,
    /// Identity bound into every executor's context.
    pub user_id: Option<String>,
}

impl RequestOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the decision map.
    #[must_use]
    pub fn with_decisions(mut self, decisions: HashMap<String, Decision>) -> Self {
        self.decisions = decisions;
        self
    }

    /// Add one decision.
    #[must_use]
    pub fn with_decision(mut self, call_id: impl Into<String>, decision: Decision) -> Self {
        self.decisions.insert(call_id.into(), decision);
        self
    }

    /// Set the executor overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: HashMap<String, Arc<dyn Tool>>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Bind a user identity into the tool context.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("decisions", &self.decisions)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Executor overrides binding `user_id` to every pending confirmation unit of
/// the last message.
#[must_use]
pub fn user_overrides(
    trace: &Trace,
    registry: &ToolRegistry,
    user_id: &str,
) -> HashMap<String, Arc<dyn Tool>> {
    let Some(last) = trace.last() else {
        return HashMap::new();
    };
    last.invocations()
        .filter(|inv| !inv.is_finalized() && registry.requires_confirmation(&inv.tool_name))
        .filter_map(|inv| {
            let tool = registry.get(&inv.tool_name)?;
            let bound: Arc<dyn Tool> = Arc::new(UserBoundTool::new(tool, user_id));
            Some((inv.call_id.clone(), bound))
        })
        .collect()
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverOutcome {
    /// The loop produced final text.
    Completed {
        /// Provider streams consumed.
        steps: u32,
    },
    /// Confirmation-required calls are waiting for a human.
    AwaitingConfirmation {
        /// Provider streams consumed.
        steps: u32,
        /// The calls waiting.
        call_ids: Vec<String>,
    },
    /// The step bound was reached without final text.
    MaxStepsReached {
        /// Provider streams consumed.
        steps: u32,
    },
}

impl DriverOutcome {
    /// Provider streams consumed.
    #[must_use]
    pub fn steps(&self) -> u32 {
        match self {
            Self::Completed { steps }
            | Self::AwaitingConfirmation { steps, .. }
            | Self::MaxStepsReached { steps } => *steps,
        }
    }

    /// The reason reported in the `finish` frame.
    #[must_use]
    pub fn finish_reason(&self) -> FinishReason {
        match self {
            Self::Completed { .. } => FinishReason::Stop,
            Self::AwaitingConfirmation { .. } => FinishReason::AwaitingConfirmation,
            Self::MaxStepsReached { .. } => FinishReason::MaxSteps,
        }
    }
}

#[derive(Debug)]
enum LoopState {
    Generating,
    AwaitingTools(Vec<String>),
    Done,
    Exhausted,
}

/// What one provider stream produced.
enum StepOutput {
    /// Final text, or nothing at all.
    Final,
    /// A new assistant message with tool calls was appended.
    Calls,
}

/// Drives one request from incoming trace to stop condition.
pub struct Driver {
    provider: Arc<dyn LlmProvider>,
    registry: ToolRegistry,
    config: OrchestratorConfig,
    system_prompt: String,
}

impl Driver {
    /// Create a driver.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: ToolRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            config,
            system_prompt: ADVISOR_PROMPT.to_string(),
        }
    }

    /// Replace the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// The tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Check a request without touching it.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Protocol`] if the trace or decisions are
    /// malformed.
    pub fn validate(
        &self,
        trace: &Trace,
        decisions: &HashMap<String, Decision>,
    ) -> OrchestratorResult<ScanReport> {
        scan(trace, &self.registry, decisions).map_err(|violation| {
            warn!(%violation, "rejecting request");
            OrchestratorError::Protocol(violation)
        })
    }

    fn executor(&self, options: &RequestOptions, mux: &Multiplexer) -> ToolExecutor {
        let mut ctx = ToolContext::new(mux.cancel_token().clone());
        ctx.user_id.clone_from(&options.user_id);
        ToolExecutor::new(self.registry.clone(), self.config.tool_timeout, ctx)
            .with_overrides(options.overrides.clone())
    }

    /// Resolve every decided confirmation unit of the last message in place.
    ///
    /// Auto units are left alone. Returns the scan of the resulting trace, so
    /// applying the same decisions again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Protocol`] if the request is malformed; the
    /// trace is untouched in that case.
    pub async fn process_trace(
        &self,
        trace: &mut Trace,
        options: &RequestOptions,
        mux: &Multiplexer,
    ) -> OrchestratorResult<ScanReport> {
        let executor = self.executor(options, mux);
        self.resolve_decisions(trace, options, &executor, mux).await
    }

    async fn resolve_decisions(
        &self,
        trace: &mut Trace,
        options: &RequestOptions,
        executor: &ToolExecutor,
        mux: &Multiplexer,
    ) -> OrchestratorResult<ScanReport> {
        let report = self.validate(trace, &options.decisions)?;
        if report.decided().next().is_none() {
            return Ok(report);
        }
        if let Some(last) = trace.last_mut() {
            let n = ResolutionApplier::new(executor, mux)
                .apply_decisions(last, &report)
                .await;
            debug!(resolved = n, "decisions applied");
        }
        self.validate(trace, &options.decisions)
    }

    /// Handle a request: resolve decisions, then advance the loop until it
    /// stops. Always ends the stream with `done`.
    ///
    /// # Errors
    ///
    /// Returns an error on protocol violations, provider failures and
    /// cancellation. An `error` frame is emitted before `done` in that case.
    pub async fn run(
        &self,
        trace: &mut Trace,
        options: &RequestOptions,
        mux: &Multiplexer,
    ) -> OrchestratorResult<DriverOutcome> {
        let result = self.run_loop(trace, options, mux).await;
        match &result {
            Ok(outcome) => mux.emit_finish(outcome.finish_reason()),
            Err(e) => {
                error!(error = %e, "request failed");
                mux.emit_error(e.to_string());
            },
        }
        mux.emit_done();
        result
    }

    async fn run_loop(
        &self,
        trace: &mut Trace,
        options: &RequestOptions,
        mux: &Multiplexer,
    ) -> OrchestratorResult<DriverOutcome> {
        let executor = self.executor(options, mux);
        let report = self.resolve_decisions(trace, options, &executor, mux).await?;

        let mut state = Self::settle(trace, report, &executor, mux).await;
        if matches!(state, LoopState::Generating) && ends_with_answer(trace) {
            debug!("trace already ends with an answer");
            state = LoopState::Done;
        }

        let mut steps: u32 = 0;
        loop {
            debug!(?state, steps, "loop state");
            state = match state {
                LoopState::Generating if steps >= self.config.max_steps => LoopState::Exhausted,
                LoopState::Generating => {
                    steps = steps.saturating_add(1);
                    match self.step(trace, mux).await? {
                        StepOutput::Final => LoopState::Done,
                        StepOutput::Calls => {
                            let report = self.validate(trace, &HashMap::new())?;
                            Self::settle(trace, report, &executor, mux).await
                        },
                    }
                },
                LoopState::AwaitingTools(call_ids) => {
                    info!(steps, pending = call_ids.len(), "awaiting confirmation");
                    return Ok(DriverOutcome::AwaitingConfirmation { steps, call_ids });
                },
                LoopState::Done => return Ok(DriverOutcome::Completed { steps }),
                LoopState::Exhausted => {
                    info!(steps, "step bound reached");
                    return Ok(DriverOutcome::MaxStepsReached { steps });
                },
            };
        }
    }

    /// Run the auto units of the last message and decide whether the loop may
    /// continue.
    async fn settle(
        trace: &mut Trace,
        report: ScanReport,
        executor: &ToolExecutor,
        mux: &Multiplexer,
    ) -> LoopState {
        if !report.pending_auto.is_empty()
            && let Some(last) = trace.last_mut()
        {
            ResolutionApplier::new(executor, mux)
                .run_auto(last, &report.pending_auto)
                .await;
        }
        let awaiting = report.awaiting();
        if awaiting.is_empty() {
            LoopState::Generating
        } else {
            LoopState::AwaitingTools(awaiting)
        }
    }

    /// Consume one provider stream and append what it produced.
    async fn step(&self, trace: &mut Trace, mux: &Multiplexer) -> OrchestratorResult<StepOutput> {
        let cancel = mux.cancel_token();
        let messages = to_provider_messages(trace);
        let tools = self.registry.definitions();

        let mut stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
            s = self.provider.stream(&messages, &tools, &self.system_prompt) => s?,
        };

        let mut text = String::new();
        // (model id, tool name, argument text); deltas go to the latest call
        // opened under an id, so a reused id never merges two argument streams.
        let mut calls: Vec<(String, String, String)> = Vec::new();

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                e = stream.next() => e,
            };
            let Some(event) = event else { break };
            match event? {
                StreamEvent::TextDelta(delta) => {
                    mux.emit_text(&delta);
                    text.push_str(&delta);
                },
                StreamEvent::ToolCallStart { id, name } => {
                    calls.push((id, name, String::new()));
                },
                StreamEvent::ToolCallDelta { id, args_delta } => {
                    if let Some((_, _, raw)) = calls.iter_mut().rev().find(|(c, _, _)| *c == id) {
                        raw.push_str(&args_delta);
                    }
                },
                StreamEvent::ToolCallEnd { .. } => {},
                StreamEvent::Usage {
                    input_tokens,
                    output_tokens,
                } => {
                    debug!(input = input_tokens, output = output_tokens, "token usage");
                },
                StreamEvent::Done => break,
                StreamEvent::Error(e) => {
                    error!(error = %e, "stream error");
                    return Err(LlmError::StreamingError(e).into());
                },
            }
        }

        if calls.is_empty() {
            if !text.is_empty() {
                trace.push(Message::assistant_text(text));
            }
            return Ok(StepOutput::Final);
        }

        let mut taken: HashSet<String> = trace
            .messages()
            .iter()
            .flat_map(Message::invocations)
            .map(|inv| inv.call_id.clone())
            .collect();

        let mut units = Vec::with_capacity(calls.len().saturating_add(1));
        if !text.is_empty() {
            units.push(Unit::Text { text });
        }
        for (id, name, raw) in calls {
            let arguments = parse_arguments(&id, &raw);
            let call_id = unique_call_id(&id, &taken);
            if call_id != id {
                warn!(model_id = %id, call_id = %call_id, "renamed duplicate call id");
            }
            taken.insert(call_id.clone());
            let inv = ToolInvocation::requested(call_id, name, arguments);
            mux.emit_tool_call(&inv);
            units.push(Unit::ToolInvocation(inv));
        }
        trace.push(Message {
            role: Role::Assistant,
            units,
        });
        Ok(StepOutput::Calls)
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn ends_with_answer(trace: &Trace) -> bool {
    trace
        .last()
        .is_some_and(|m| m.role == Role::Assistant && m.invocations().next().is_none())
}

fn parse_arguments(call_id: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(call_id, error = %e, "unparseable tool arguments");
        Value::String(raw.to_string())
    })
}

fn unique_call_id(id: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(id) {
        return id.to_string();
    }
    (1u32..)
        .map(|n| format!("{id}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| id.to_string())
}

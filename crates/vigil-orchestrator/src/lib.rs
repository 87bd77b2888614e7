//! Vigil Orchestrator - human-confirmation tool-call orchestration.
//!
//! This crate provides:
//! - The trace [`scan`]ner, which validates a resent trace and classifies the
//!   invocation units of its last message
//! - The [`ResolutionApplier`], which turns human decisions into terminal
//!   payloads, running approved executors concurrently and at most once
//! - The [`Multiplexer`], which forwards text and tool results to the client
//!   as they happen
//! - The [`Driver`], which ties these to the reasoning loop
//!
//! No state survives a request. Everything the orchestrator needs is rebuilt
//! from the trace the caller sends.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vigil_core::{Message, Trace};
//! use vigil_orchestrator::{Driver, Multiplexer, OrchestratorConfig, RequestOptions};
//! # async fn example(provider: Arc<dyn vigil_llm::LlmProvider>, registry: vigil_tools::ToolRegistry) {
//! let driver = Driver::new(provider, registry, OrchestratorConfig::default());
//! let (mux, mut frames) = Multiplexer::new(CancellationToken::new());
//!
//! let mut trace = Trace::from(vec![Message::user("How is AAPL doing?")]);
//! let outcome = driver.run(&mut trace, &RequestOptions::new(), &mux).await;
//! while let Ok(frame) = frames.try_recv() {
//!     println!("{}", serde_json::to_string(&frame).unwrap());
//! }
//! # let _ = outcome;
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod applier;
pub mod config;
pub mod convert;
pub mod driver;
pub mod error;
pub mod multiplexer;
pub mod prompt;
pub mod scanner;

pub use applier::{ResolutionApplier, ToolExecutor, cancellation_payload, failure_payload};
pub use config::{DEFAULT_MAX_STEPS, DEFAULT_TOOL_TIMEOUT, OrchestratorConfig};
pub use convert::to_provider_messages;
pub use driver::{Driver, DriverOutcome, RequestOptions, user_overrides};
pub use error::{OrchestratorError, OrchestratorResult, ProtocolViolation};
pub use multiplexer::Multiplexer;
pub use prompt::{ADVISOR_PROMPT, CONFIRMING_ADVISOR_PROMPT, system_prompt};
pub use scanner::{PendingConfirmation, ScanReport, scan};

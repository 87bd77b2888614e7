//! Vigil Telemetry - logging setup and request correlation.
//!
//! This crate provides:
//! - [`LogConfig`] and [`setup_logging`] for the global `tracing` subscriber
//! - [`RequestContext`], whose span tags every log line of one request
//!
//! # Example
//!
//! ```rust,no_run
//! use vigil_telemetry::{LogConfig, LogFormat, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), vigil_telemetry::TelemetryError> {
//! setup_logging(
//!     &LogConfig::new("info")
//!         .with_format(LogFormat::Compact)
//!         .with_directive("vigil_orchestrator=debug"),
//! )?;
//!
//! let ctx = RequestContext::new("/api/chat-hil");
//! let _guard = ctx.span().entered();
//! tracing::info!("handling request");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};

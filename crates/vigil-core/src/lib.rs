//! Vigil Core - shared data model for the human-confirmation orchestrator.
//!
//! This crate provides:
//! - The interaction [`Trace`]: ordered [`Message`]s made of text and
//!   [`ToolInvocation`] units
//! - The [`ToolResultSlot`], which keeps a human [`Decision`] and a real tool
//!   payload in disjoint variants
//! - The outbound [`StreamFrame`] protocol
//!
//! The trace is the whole protocol: every request carries the full history,
//! and a human decision travels inside the result slot of the unit it answers.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use vigil_core::{Decision, Message, ToolInvocation, Trace};
//!
//! let mut trace = Trace::new();
//! trace.push(Message::user("Buy 10 AAPL at 150"));
//! trace.push(Message::assistant_invocations(vec![
//!     ToolInvocation::requested("c1", "placeOrder", json!({"symbol": "AAPL"}))
//!         .with_decision(Decision::Approve),
//! ]));
//!
//! let unit = trace.find_invocation("c1").unwrap();
//! assert_eq!(unit.decision(), Some(Decision::Approve));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod frame;
pub mod trace;

pub use error::{CoreError, CoreResult};
pub use frame::{FinishReason, StreamFrame};
pub use trace::{
    Decision, InvocationStatus, Message, Role, ToolInvocation, ToolResultSlot, Trace, Unit,
};

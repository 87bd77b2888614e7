#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! HTTP surface for Vigil.
//!
//! - `POST /api/chat`: every tool executes without asking
//! - `POST /api/chat-hil`: order creation waits for a human decision
//! - `GET /health`
//!
//! Chat routes take `{messages, decisions?, userId?}` and answer with a
//! `text/event-stream` of JSON frames ending in `data: [DONE]`. Malformed
//! requests are refused with HTTP 400 before any frame is sent.
//!
//! ```rust,no_run
//! # async fn example(state: vigil_gateway::GatewayState) -> vigil_gateway::GatewayResult<()> {
//! vigil_gateway::serve("127.0.0.1:3000", state).await
//! # }
//! ```

mod error;
mod routes;
mod server;
mod sse;
mod state;

pub use error::{GatewayError, GatewayResult};
pub use routes::{ChatRequest, HEALTH_PATH, router};
pub use server::{serve, serve_listener};
pub use sse::{DONE_CHUNK, encode_frame};
pub use state::{ChatRoute, GatewayState};

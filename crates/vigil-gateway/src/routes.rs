//! HTTP routes.

use std::collections::HashMap;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};
use vigil_core::{Decision, Trace};
use vigil_orchestrator::{Multiplexer, RequestOptions, user_overrides};
use vigil_telemetry::RequestContext;

use crate::error::{GatewayError, GatewayResult};
use crate::sse::{frame_stream, sse_response};
use crate::state::{ChatRoute, GatewayState};

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";

/// Body of both chat routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The full conversation so far.
    pub messages: Trace,
    /// Fresh decisions keyed by call id.
    #[serde(default)]
    pub decisions: HashMap<String, Decision>,
    /// Who is acting.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(ChatRoute::Chat.path(), post(chat))
        .route(ChatRoute::Confirmed.path(), post(chat_confirmed))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn chat(
    State(state): State<GatewayState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> GatewayResult<Response> {
    start_stream(&state, ChatRoute::Chat, body)
}

async fn chat_confirmed(
    State(state): State<GatewayState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> GatewayResult<Response> {
    start_stream(&state, ChatRoute::Confirmed, body)
}

/// Validate, then hand the request to a background driver and stream its frames.
fn start_stream(
    state: &GatewayState,
    route: ChatRoute,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> GatewayResult<Response> {
    let Json(request) = body.map_err(|e| GatewayError::BadRequest(e.body_text()))?;

    let mut ctx = RequestContext::new(route.path());
    if let Some(user_id) = &request.user_id {
        ctx = ctx.with_user(user_id.clone());
    }
    let span = ctx.span();
    let driver = state.driver(route);

    span.in_scope(|| driver.validate(&request.messages, &request.decisions))?;

    let mut options = RequestOptions::new().with_decisions(request.decisions);
    if let Some(user_id) = request.user_id {
        options = match route {
            ChatRoute::Chat => options.with_user(user_id),
            ChatRoute::Confirmed => options.with_overrides(user_overrides(
                &request.messages,
                driver.registry(),
                &user_id,
            )),
        };
    }

    let cancel = CancellationToken::new();
    let (mux, rx) = Multiplexer::new(cancel.clone());
    let mut trace = request.messages;

    tokio::spawn(
        async move {
            match driver.run(&mut trace, &options, &mux).await {
                Ok(outcome) => info!(
                    elapsed_ms = ctx.elapsed_ms(),
                    steps = outcome.steps(),
                    reason = ?outcome.finish_reason(),
                    "request finished"
                ),
                Err(e) => warn!(elapsed_ms = ctx.elapsed_ms(), error = %e, "request failed"),
            }
        }
        .instrument(span),
    );

    Ok(sse_response(frame_stream(rx, cancel)))
}

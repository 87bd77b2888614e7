//! Confirmation flow through the HTTP routes.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;
use vigil_core::{Decision, Message, ToolInvocation, Trace};
use vigil_gateway::{GatewayState, router};
use vigil_orchestrator::{Driver, OrchestratorConfig};
use vigil_test::{
    MockLlmProvider, MockLlmTurn, MockToolCall, ScriptedTool, order_args, pending_trace,
    place_order_tool, registry_with,
};

fn app(provider: Arc<MockLlmProvider>, tool: &Arc<ScriptedTool>) -> Router {
    let driver = || {
        Driver::new(
            provider.clone(),
            registry_with(&[Arc::clone(tool)]),
            OrchestratorConfig::default(),
        )
    };
    router(GatewayState::from_drivers(driver(), driver()))
}

async fn post(app: Router, path: &str, body: Value) -> (StatusCode, Vec<Value>) {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let frames = text
        .split("\n\n")
        .filter_map(|chunk| chunk.strip_prefix("data: "))
        .filter(|data| *data != "[DONE]")
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    (status, frames)
}

fn types(frames: &[Value]) -> Vec<&str> {
    frames.iter().filter_map(|f| f["type"].as_str()).collect()
}

#[tokio::test]
async fn test_confirmation_round_trip() {
    let tool = Arc::new(place_order_tool());
    let provider = Arc::new(MockLlmProvider::new(vec![
        MockLlmTurn::tool_calls(vec![MockToolCall::with_id(
            "c1",
            "placeOrder",
            order_args("AAPL", 10, 150.0),
        )]),
        MockLlmTurn::text("Your order is placed."),
    ]));

    let trace = Trace::from(vec![Message::user("Buy 10 shares of AAPL at 150")]);
    let (status, frames) = post(
        app(provider.clone(), &tool),
        "/api/chat-hil",
        json!({"messages": trace}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(types(&frames), vec!["toolCall", "finish", "done"]);
    assert_eq!(frames[1]["reason"], "awaiting-confirmation");
    assert_eq!(tool.invocations(), 0);

    let resend = pending_trace(vec![ToolInvocation::requested(
        "c1",
        "placeOrder",
        order_args("AAPL", 10, 150.0),
    )]);
    let (status, frames) = post(
        app(provider.clone(), &tool),
        "/api/chat-hil",
        json!({"messages": resend, "decisions": {"c1": "approve"}, "userId": "alice"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(types(&frames), vec!["toolResult", "text", "finish", "done"]);
    assert_eq!(frames[0]["callId"], "c1");
    assert_eq!(frames[0]["payload"]["success"], true);
    assert_eq!(
        frames[0]["payload"]["message"],
        "Successfully created BUY order for 10 shares of AAPL at $150 per share."
    );
    assert_eq!(tool.invocations(), 1);
    assert_eq!(tool.recorded_users(), vec![Some("alice".to_string())]);
}

#[tokio::test]
async fn test_rejection_in_slot_never_executes() {
    let tool = Arc::new(place_order_tool());
    let provider = Arc::new(MockLlmProvider::new(vec![MockLlmTurn::text(
        "Understood, no order placed.",
    )]));

    let trace = pending_trace(vec![
        ToolInvocation::requested("c1", "placeOrder", order_args("AAPL", 10, 150.0))
            .with_decision(Decision::Reject),
    ]);
    let (status, frames) = post(
        app(provider, &tool),
        "/api/chat-hil",
        json!({"messages": trace}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(frames[0]["type"], "toolResult");
    assert_eq!(frames[0]["payload"]["success"], false);
    assert_eq!(frames[0]["payload"]["message"], "cancelled by user");
    assert_eq!(tool.invocations(), 0);
}

#[tokio::test]
async fn test_conflicting_decisions_are_refused() {
    let tool = Arc::new(place_order_tool());
    let provider = Arc::new(MockLlmProvider::new(vec![MockLlmTurn::text("unused")]));

    let trace = pending_trace(vec![
        ToolInvocation::requested("c1", "placeOrder", order_args("AAPL", 10, 150.0))
            .with_decision(Decision::Approve),
    ]);
    let (status, _) = post(
        app(provider.clone(), &tool),
        "/api/chat-hil",
        json!({"messages": trace, "decisions": {"c1": "reject"}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.call_count(), 0);
    assert_eq!(tool.invocations(), 0);
}

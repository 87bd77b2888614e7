//! Approve, reject and mixed decisions on a single `placeOrder` message.

mod common;

use std::time::Duration;

use common::{Harness, outcome, result_ids};
use pretty_assertions::assert_eq;
use serde_json::json;
use vigil_core::{Decision, FinishReason, StreamFrame, ToolInvocation};
use vigil_orchestrator::{DriverOutcome, RequestOptions};
use vigil_test::{MockLlmTurn, order_args, pending_trace, place_order_tool};

fn order(call_id: &str, decision: Decision) -> ToolInvocation {
    ToolInvocation::requested(call_id, "placeOrder", order_args("AAPL", 10, 150.0))
        .with_decision(decision)
}

#[tokio::test]
async fn test_approved_order_is_placed() {
    let h = Harness::new(vec![MockLlmTurn::text("Done: 10 AAPL at $150.")]);
    let mut trace = pending_trace(vec![order("c1", Decision::Approve)]);

    let (result, frames) = h.run(&mut trace, &RequestOptions::new()).await;

    assert_eq!(result.unwrap(), DriverOutcome::Completed { steps: 1 });
    assert_eq!(h.order_tool.invocations(), 1);
    assert_eq!(h.order_tool.recorded_args(), vec![order_args("AAPL", 10, 150.0)]);

    let payload = outcome(&trace, "c1").unwrap();
    assert_eq!(payload["success"], true);
    assert!(payload["orderId"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(
        payload["message"],
        "Successfully created BUY order for 10 shares of AAPL at $150 per share."
    );

    assert_eq!(result_ids(&frames), vec!["c1"]);
    assert_eq!(
        frames.iter().rev().nth(1),
        Some(&StreamFrame::Finish {
            reason: FinishReason::Stop
        })
    );
}

#[tokio::test]
async fn test_rejected_order_is_cancelled() {
    let h = Harness::new(vec![MockLlmTurn::text("Okay, I will not place it.")]);
    let mut trace = pending_trace(vec![order("c1", Decision::Reject)]);

    let (result, _) = h.run(&mut trace, &RequestOptions::new()).await;

    assert!(result.is_ok());
    assert_eq!(h.order_tool.invocations(), 0);
    assert_eq!(
        outcome(&trace, "c1"),
        Some(&json!({"success": false, "message": "cancelled by user"}))
    );
}

#[tokio::test(start_paused = true)]
async fn test_independent_decisions_resolve_in_any_order() {
    let h = Harness::with_order_tool(
        vec![],
        place_order_tool().with_delay(Duration::from_millis(50)),
    );
    let mut trace = pending_trace(vec![
        order("c1", Decision::Approve),
        order("c2", Decision::Reject),
    ]);

    let (result, frames) = h.process(&mut trace, &RequestOptions::new()).await;

    assert!(result.unwrap().is_settled());
    assert_eq!(result_ids(&frames), vec!["c2", "c1"]);
    assert_eq!(h.order_tool.invocations(), 1);
    assert_eq!(outcome(&trace, "c1").unwrap()["success"], true);
    assert_eq!(outcome(&trace, "c2").unwrap()["success"], false);

    let ids: Vec<_> = trace
        .last()
        .unwrap()
        .invocations()
        .map(|i| i.call_id.clone())
        .collect();
    assert_eq!(ids, vec!["c1", "c2"]);
}

#[tokio::test]
async fn test_auto_tool_runs_then_order_waits() {
    let h = Harness::new(vec![
        MockLlmTurn::tool_calls(vec![vigil_test::MockToolCall::with_id(
            "q1",
            "getStockQuote",
            json!({"symbol": "AAPL"}),
        )]),
        MockLlmTurn::text_then_calls(
            "AAPL trades at $150. Shall I buy?",
            vec![vigil_test::MockToolCall::with_id(
                "c1",
                "placeOrder",
                order_args("AAPL", 10, 150.0),
            )],
        ),
    ]);
    let mut trace = vigil_core::Trace::from(vec![vigil_core::Message::user("Buy 10 AAPL")]);

    let (result, frames) = h.run(&mut trace, &RequestOptions::new()).await;

    assert_eq!(
        result.unwrap(),
        DriverOutcome::AwaitingConfirmation {
            steps: 2,
            call_ids: vec!["c1".into()],
        }
    );
    assert_eq!(h.quote_tool.invocations(), 1);
    assert_eq!(h.order_tool.invocations(), 0);
    assert_eq!(result_ids(&frames), vec!["q1"]);
    assert!(outcome(&trace, "q1").is_some());
    assert!(outcome(&trace, "c1").is_none());
}

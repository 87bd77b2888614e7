//! The built-in stock tools behind a confirmation-gated driver.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use vigil_core::{Decision, StreamFrame, Trace};
use vigil_orchestrator::{
    Driver, DriverOutcome, Multiplexer, OrchestratorConfig, OrchestratorResult, RequestOptions,
    system_prompt, user_overrides,
};
use vigil_storage::{MemoryOrderStore, OrderStore, OrderType};
use vigil_test::{MockLlmProvider, MockLlmTurn, MockToolCall};
use vigil_tools::{MarketDataClient, OrderMode, StockToolset, WebSearchTool};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Advisor {
    driver: Driver,
    store: Arc<MemoryOrderStore>,
    _market: MockServer,
}

async fn advisor(turns: Vec<MockLlmTurn>) -> Advisor {
    let market = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL"))
        .and(query_param("apikey", "test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"symbol": "AAPL", "price": 150.0}])),
        )
        .mount(&market)
        .await;

    let store = Arc::new(MemoryOrderStore::new());
    let toolset = StockToolset::new(
        MarketDataClient::new(market.uri(), Some("test-key".into())),
        WebSearchTool::new(format!("{}/search", market.uri()), None),
        Arc::clone(&store) as Arc<dyn OrderStore>,
    );
    let mode = OrderMode::Confirmed;
    let driver = Driver::new(
        Arc::new(MockLlmProvider::new(turns)),
        toolset.registry(mode),
        OrchestratorConfig::default(),
    )
    .with_system_prompt(system_prompt(mode));

    Advisor {
        driver,
        store,
        _market: market,
    }
}

async fn send(
    advisor: &Advisor,
    trace: &mut Trace,
    user: &str,
) -> (OrchestratorResult<DriverOutcome>, Vec<StreamFrame>) {
    let options = RequestOptions::new().with_overrides(user_overrides(
        trace,
        advisor.driver.registry(),
        user,
    ));
    let (mux, mut rx) = Multiplexer::new(CancellationToken::new());
    let result = advisor.driver.run(trace, &options, &mux).await;
    drop(mux);
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    (result, frames)
}

fn order_call() -> MockToolCall {
    MockToolCall::with_id(
        "c1",
        "createStockOrderWithConfirmation",
        json!({"symbol": "AAPL", "quantity": 10, "price": 150.0, "orderType": "BUY"}),
    )
}

#[tokio::test]
async fn test_confirmed_order_lands_in_store_once() {
    let advisor = advisor(vec![
        MockLlmTurn::tool_calls(vec![MockToolCall::with_id(
            "q1",
            "getStockQuote",
            json!({"symbol": "AAPL"}),
        )]),
        MockLlmTurn::text_then_calls("AAPL is at $150. Confirm the order?", vec![order_call()]),
        MockLlmTurn::text("Your order is in."),
    ])
    .await;
    let mut trace = Trace::from(vec![vigil_core::Message::user("Buy 10 AAPL")]);

    let (first, _) = send(&advisor, &mut trace, "alice").await;
    assert_eq!(
        first.unwrap(),
        DriverOutcome::AwaitingConfirmation {
            steps: 2,
            call_ids: vec!["c1".into()],
        }
    );
    let quote = trace.find_invocation("q1").and_then(|i| i.outcome()).unwrap();
    assert_eq!(quote["data"]["price"], 150.0);
    assert!(advisor.store.is_empty().await);

    let slot = trace.find_invocation_mut("c1").unwrap();
    *slot = slot.clone().with_decision(Decision::Approve);

    let (second, frames) = send(&advisor, &mut trace, "alice").await;
    assert_eq!(second.unwrap(), DriverOutcome::Completed { steps: 1 });
    assert!(frames.contains(&StreamFrame::Text {
        delta: "Your order is in.".into()
    }));

    let orders = advisor.store.get_by_user("alice").await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].symbol, "AAPL");
    assert_eq!(orders[0].quantity, 10);
    assert_eq!(orders[0].order_type, OrderType::Buy);

    let payload = trace.find_invocation("c1").and_then(|i| i.outcome()).unwrap();
    assert_eq!(payload["orderId"], Value::String(orders[0].id.clone()));

    let (third, frames) = send(&advisor, &mut trace, "alice").await;
    assert_eq!(third.unwrap(), DriverOutcome::Completed { steps: 0 });
    assert!(
        !frames
            .iter()
            .any(|f| matches!(f, StreamFrame::ToolResult { .. }))
    );
    assert_eq!(advisor.store.len().await, 1);
}

#[tokio::test]
async fn test_rejected_order_leaves_store_empty() {
    let advisor = advisor(vec![MockLlmTurn::text("Understood, no order placed.")]).await;
    let mut trace = vigil_test::pending_trace(vec![
        vigil_core::ToolInvocation::requested(
            "c1",
            "createStockOrderWithConfirmation",
            json!({"symbol": "AAPL", "quantity": 10, "price": 150.0, "orderType": "BUY"}),
        )
        .with_decision(Decision::Reject),
    ]);

    let (result, _) = send(&advisor, &mut trace, "alice").await;

    assert!(result.is_ok());
    assert!(advisor.store.is_empty().await);
    let payload = trace.find_invocation("c1").and_then(|i| i.outcome()).unwrap();
    assert_eq!(payload["success"], false);
}

#[tokio::test]
async fn test_order_without_user_fails_softly() {
    let advisor = advisor(vec![MockLlmTurn::text("I need to know who you are.")]).await;
    let mut trace = vigil_test::pending_trace(vec![
        vigil_core::ToolInvocation::requested(
            "c1",
            "createStockOrderWithConfirmation",
            json!({"symbol": "AAPL", "quantity": 10, "price": 150.0, "orderType": "BUY"}),
        )
        .with_decision(Decision::Approve),
    ]);

    let options = RequestOptions::new();
    let (mux, _rx) = Multiplexer::new(CancellationToken::new());
    let result = advisor.driver.run(&mut trace, &options, &mux).await;

    assert!(result.is_ok());
    assert!(advisor.store.is_empty().await);
    let payload = trace.find_invocation("c1").and_then(|i| i.outcome()).unwrap();
    assert_eq!(payload["success"], false);
}

//! Shared harness: a driver over a scripted order tool and a scripted quote tool.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use vigil_core::{StreamFrame, Trace};
use vigil_orchestrator::{
    Driver, DriverOutcome, Multiplexer, OrchestratorConfig, OrchestratorResult, RequestOptions,
    ScanReport,
};
use vigil_test::{MockLlmProvider, MockLlmTurn, ScriptedTool, place_order_tool, registry_with};

#[allow(dead_code)]
pub struct Harness {
    pub driver: Driver,
    pub provider: Arc<MockLlmProvider>,
    pub order_tool: Arc<ScriptedTool>,
    pub quote_tool: Arc<ScriptedTool>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(turns: Vec<MockLlmTurn>) -> Self {
        Self::with_order_tool(turns, place_order_tool())
    }

    pub fn with_order_tool(turns: Vec<MockLlmTurn>, order_tool: ScriptedTool) -> Self {
        let provider = Arc::new(MockLlmProvider::new(turns));
        let order_tool = Arc::new(order_tool);
        let quote_tool = Arc::new(
            ScriptedTool::new("getStockQuote")
                .returning(json!({"success": true, "data": {"symbol": "AAPL", "price": 150}})),
        );
        let driver = Driver::new(
            provider.clone(),
            registry_with(&[Arc::clone(&order_tool), Arc::clone(&quote_tool)]),
            OrchestratorConfig::default(),
        );
        Self {
            driver,
            provider,
            order_tool,
            quote_tool,
        }
    }

    /// Resolve decisions only; the reasoning loop is not touched.
    pub async fn process(
        &self,
        trace: &mut Trace,
        options: &RequestOptions,
    ) -> (OrchestratorResult<ScanReport>, Vec<StreamFrame>) {
        let (mux, rx) = Multiplexer::new(CancellationToken::new());
        let result = self.driver.process_trace(trace, options, &mux).await;
        drop(mux);
        (result, drain(rx))
    }

    /// A full request.
    pub async fn run(
        &self,
        trace: &mut Trace,
        options: &RequestOptions,
    ) -> (OrchestratorResult<DriverOutcome>, Vec<StreamFrame>) {
        let (mux, rx) = Multiplexer::new(CancellationToken::new());
        let result = self.driver.run(trace, options, &mux).await;
        drop(mux);
        (result, drain(rx))
    }
}

fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<StreamFrame>) -> Vec<StreamFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

/// The terminal payload of `call_id`, if it has one.
#[allow(dead_code)]
pub fn outcome<'a>(trace: &'a Trace, call_id: &str) -> Option<&'a Value> {
    trace.find_invocation(call_id).and_then(|inv| inv.outcome())
}

/// Call ids of the `toolResult` frames, in emission order.
#[allow(dead_code)]
pub fn result_ids(frames: &[StreamFrame]) -> Vec<String> {
    frames
        .iter()
        .filter(|f| matches!(f, StreamFrame::ToolResult { .. }))
        .filter_map(|f| f.call_id().map(ToString::to_string))
        .collect()
}

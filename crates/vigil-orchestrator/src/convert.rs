//! Trace to provider conversation.
//!
//! Only finalized invocations are sent; a unit still waiting for a result is
//! invisible to the model, so generation never runs past it.

use vigil_core::{Role, ToolInvocation, Trace, Unit};
use vigil_llm::{Message as LlmMessage, ToolCall, ToolCallResult};

/// Build the provider conversation for `trace`.
#[must_use]
pub fn to_provider_messages(trace: &Trace) -> Vec<LlmMessage> {
    let mut out = Vec::new();
    for message in trace.messages() {
        match message.role {
            Role::User => {
                let text = message.text();
                if !text.is_empty() {
                    out.push(LlmMessage::user(text));
                }
            },
            Role::Assistant => push_assistant(&mut out, &message.units),
        }
    }
    out
}

fn push_assistant(out: &mut Vec<LlmMessage>, units: &[Unit]) {
    let mut text = String::new();
    let mut calls: Vec<&ToolInvocation> = Vec::new();

    for unit in units {
        match unit {
            Unit::Text { text: t } => {
                flush_calls(out, &mut calls);
                text.push_str(t);
            },
            Unit::ToolInvocation(inv) => {
                if !text.is_empty() {
                    out.push(LlmMessage::assistant(std::mem::take(&mut text)));
                }
                if inv.is_finalized() {
                    calls.push(inv);
                }
            },
        }
    }
    flush_calls(out, &mut calls);
    if !text.is_empty() {
        out.push(LlmMessage::assistant(text));
    }
}

fn flush_calls(out: &mut Vec<LlmMessage>, calls: &mut Vec<&ToolInvocation>) {
    if calls.is_empty() {
        return;
    }
    out.push(LlmMessage::assistant_with_tools(
        calls
            .iter()
            .map(|inv| {
                ToolCall::new(inv.call_id.clone(), inv.tool_name.clone())
                    .with_arguments(inv.arguments.clone())
            })
            .collect(),
    ));
    for inv in calls.drain(..) {
        if let Some(payload) = inv.outcome() {
            out.push(LlmMessage::tool_result(ToolCallResult::from_payload(
                inv.call_id.clone(),
                payload,
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_core::{Decision, Message};
    use vigil_llm::MessageRole;

    #[test]
    fn test_finalized_calls_become_call_and_result() {
        let trace = Trace::from(vec![
            Message::user("price of AAPL?"),
            Message {
                role: Role::Assistant,
                units: vec![
                    Unit::Text {
                        text: "Let me check.".into(),
                    },
                    Unit::ToolInvocation(
                        ToolInvocation::requested("q1", "getStockQuote", json!({"symbol": "AAPL"}))
                            .with_outcome(json!({"success": true, "data": {"price": 190}})),
                    ),
                ],
            },
            Message::assistant_text("AAPL trades at 190."),
        ]);

        let msgs = to_provider_messages(&trace);
        let roles: Vec<_> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::Assistant,
            ]
        );
        assert_eq!(msgs[1].text(), Some("Let me check."));
        let calls = msgs[2].tool_calls().unwrap();
        assert_eq!(calls[0].id, "q1");
        assert_eq!(calls[0].arguments, json!({"symbol": "AAPL"}));
    }

    #[test]
    fn test_unresolved_units_are_not_sent() {
        let trace = Trace::from(vec![
            Message::user("buy"),
            Message::assistant_invocations(vec![
                ToolInvocation::requested("c1", "placeOrder", json!({})),
                ToolInvocation::requested("c2", "placeOrder", json!({}))
                    .with_decision(Decision::Approve),
            ]),
        ]);
        let msgs = to_provider_messages(&trace);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, MessageRole::User);
    }

    #[test]
    fn test_partial_resolution_sends_only_finalized() {
        let trace = Trace::from(vec![Message::assistant_invocations(vec![
            ToolInvocation::requested("a", "getStockQuote", json!({}))
                .with_outcome(json!({"success": true})),
            ToolInvocation::requested("b", "placeOrder", json!({})),
        ])]);
        let msgs = to_provider_messages(&trace);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].tool_calls().map(<[ToolCall]>::len), Some(1));
    }
}

//! Interaction trace types.
//!
//! A [`Trace`] is the ordered conversation history. It only grows: units are
//! never removed or reordered, and the only mutation ever applied to an
//! existing unit is the in-place substitution of its result slot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human.
    User,
    /// The reasoning loop.
    Assistant,
}

/// A human's answer to a confirmation-required tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Run the tool.
    Approve,
    /// Do not run the tool.
    Reject,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for Decision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "yes" => Ok(Self::Approve),
            "reject" | "no" => Ok(Self::Reject),
            other => Err(CoreError::InvalidDecision(other.to_string())),
        }
    }
}

/// Contents of a tool invocation's result slot.
///
/// A pending human decision and a real tool payload live in separate
/// variants, so no executor output can ever be read back as a decision.
///
/// Wire form: `{"kind": "decision", "value": "approve"}` or
/// `{"kind": "outcome", "value": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolResultSlot {
    /// The slot holds the human's decision; the tool has not produced a result.
    Decision(Decision),
    /// The slot holds the tool's terminal payload.
    Outcome(Value),
}

/// Lifecycle state of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    /// Issued by the reasoning loop, no result yet.
    Requested,
    /// The result slot is populated (with a decision or an outcome).
    Resolved,
}

/// A single tool-call request and its eventual result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// Identifier unique within the trace; the only join key for decisions.
    pub call_id: String,
    /// Registered tool name.
    pub tool_name: String,
    /// Tool arguments as produced by the reasoning loop.
    #[serde(default)]
    pub arguments: Value,
    /// Lifecycle state.
    pub status: InvocationStatus,
    /// Result slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResultSlot>,
}

impl ToolInvocation {
    /// Create a freshly requested invocation with an empty result slot.
    pub fn requested(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
            status: InvocationStatus::Requested,
            result: None,
        }
    }

    /// Place a human decision into the result slot.
    ///
    /// This is what a client does before resending the trace.
    #[must_use]
    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.status = InvocationStatus::Resolved;
        self.result = Some(ToolResultSlot::Decision(decision));
        self
    }

    /// Set a terminal payload.
    #[must_use]
    pub fn with_outcome(mut self, payload: Value) -> Self {
        self.resolve(payload);
        self
    }

    /// Write a terminal payload into the slot, marking the unit resolved.
    pub fn resolve(&mut self, payload: Value) {
        self.status = InvocationStatus::Resolved;
        self.result = Some(ToolResultSlot::Outcome(payload));
    }

    /// The decision currently held in the slot, if any.
    #[must_use]
    pub fn decision(&self) -> Option<Decision> {
        match self.result {
            Some(ToolResultSlot::Decision(d)) => Some(d),
            _ => None,
        }
    }

    /// The terminal payload, if the unit has one.
    #[must_use]
    pub fn outcome(&self) -> Option<&Value> {
        match &self.result {
            Some(ToolResultSlot::Outcome(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether the unit holds a real payload and can never change again.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.status == InvocationStatus::Resolved && self.outcome().is_some()
    }
}

/// One atomic step of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Unit {
    /// Plain text.
    Text {
        /// The text payload.
        text: String,
    },
    /// A tool call.
    ToolInvocation(ToolInvocation),
}

impl Unit {
    /// Borrow the invocation if this is a tool-call unit.
    #[must_use]
    pub fn as_invocation(&self) -> Option<&ToolInvocation> {
        match self {
            Self::ToolInvocation(inv) => Some(inv),
            Self::Text { .. } => None,
        }
    }

    /// Mutably borrow the invocation if this is a tool-call unit.
    pub fn as_invocation_mut(&mut self) -> Option<&mut ToolInvocation> {
        match self {
            Self::ToolInvocation(inv) => Some(inv),
            Self::Text { .. } => None,
        }
    }
}

/// A message in the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: Role,
    /// Ordered units.
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl Message {
    /// A user message with a single text unit.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            units: vec![Unit::Text { text: text.into() }],
        }
    }

    /// An assistant message with a single text unit.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            units: vec![Unit::Text { text: text.into() }],
        }
    }

    /// An assistant message made of tool invocations.
    #[must_use]
    pub fn assistant_invocations(invocations: Vec<ToolInvocation>) -> Self {
        Self {
            role: Role::Assistant,
            units: invocations.into_iter().map(Unit::ToolInvocation).collect(),
        }
    }

    /// Iterate over the tool invocations of this message, in order.
    pub fn invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.units.iter().filter_map(Unit::as_invocation)
    }

    /// Concatenated text of all text units.
    #[must_use]
    pub fn text(&self) -> String {
        self.units
            .iter()
            .filter_map(|u| match u {
                Unit::Text { text } => Some(text.as_str()),
                Unit::ToolInvocation(_) => None,
            })
            .collect()
    }
}

/// The ordered interaction history resent by the caller on every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    messages: Vec<Message>,
}

impl Trace {
    /// Create an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a trace from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTrace`] if the JSON does not describe a trace.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// All messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the trace has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Mutable access to the most recent message.
    pub fn last_mut(&mut self) -> Option<&mut Message> {
        self.messages.last_mut()
    }

    /// Find an invocation anywhere in the trace.
    #[must_use]
    pub fn find_invocation(&self, call_id: &str) -> Option<&ToolInvocation> {
        self.messages
            .iter()
            .flat_map(Message::invocations)
            .find(|inv| inv.call_id == call_id)
    }

    /// Find an invocation anywhere in the trace, mutably.
    pub fn find_invocation_mut(&mut self, call_id: &str) -> Option<&mut ToolInvocation> {
        self.messages
            .iter_mut()
            .flat_map(|m| m.units.iter_mut())
            .filter_map(Unit::as_invocation_mut)
            .find(|inv| inv.call_id == call_id)
    }
}

impl From<Vec<Message>> for Trace {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decision_wire_form() {
        let inv = ToolInvocation::requested("c1", "placeOrder", json!({"symbol": "AAPL"}))
            .with_decision(Decision::Approve);
        let value = serde_json::to_value(&inv).unwrap();
        assert_eq!(
            value,
            json!({
                "callId": "c1",
                "toolName": "placeOrder",
                "arguments": {"symbol": "AAPL"},
                "status": "resolved",
                "result": {"kind": "decision", "value": "approve"}
            })
        );
    }

    #[test]
    fn test_payload_resembling_a_decision_stays_an_outcome() {
        // A tool that happens to return the string "approve" must not be
        // mistaken for a pending approval.
        let inv = ToolInvocation::requested("c1", "echo", json!({})).with_outcome(json!("approve"));
        let json = serde_json::to_string(&inv).unwrap();
        let back: ToolInvocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.decision(), None);
        assert_eq!(back.outcome(), Some(&json!("approve")));
        assert!(back.is_finalized());
    }

    #[test]
    fn test_requested_unit_has_no_result_on_the_wire() {
        let inv = ToolInvocation::requested("c9", "getStockQuote", json!({"symbol": "MSFT"}));
        let value = serde_json::to_value(&inv).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["status"], "requested");
    }

    #[test]
    fn test_trace_json_shape() {
        let json = r#"[
            {"role": "user", "units": [{"type": "text", "text": "hi"}]},
            {"role": "assistant", "units": [
                {"type": "text", "text": "placing"},
                {"type": "toolInvocation", "callId": "c1", "toolName": "placeOrder",
                 "arguments": {}, "status": "resolved",
                 "result": {"kind": "decision", "value": "reject"}}
            ]}
        ]"#;
        let trace = Trace::from_json(json).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.last().unwrap().role, Role::Assistant);
        assert_eq!(
            trace.find_invocation("c1").unwrap().decision(),
            Some(Decision::Reject)
        );
    }

    #[test]
    fn test_invalid_trace_is_reported() {
        let err = Trace::from_json(r#"[{"role": "robot"}]"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTrace(_)));
    }

    #[test]
    fn test_decision_from_str() {
        assert_eq!("approve".parse::<Decision>().unwrap(), Decision::Approve);
        assert_eq!(" REJECT ".parse::<Decision>().unwrap(), Decision::Reject);
        assert_eq!("yes".parse::<Decision>().unwrap(), Decision::Approve);
        assert!("maybe".parse::<Decision>().is_err());
    }

    #[test]
    fn test_find_invocation_mut_resolves_in_place() {
        let mut trace = Trace::from(vec![
            Message::user("q"),
            Message::assistant_invocations(vec![
                ToolInvocation::requested("a", "t", json!({})),
                ToolInvocation::requested("b", "t", json!({})),
            ]),
        ]);
        trace
            .find_invocation_mut("b")
            .unwrap()
            .resolve(json!({"success": true}));

        let ids: Vec<_> = trace
            .last()
            .unwrap()
            .invocations()
            .map(|i| (i.call_id.as_str(), i.is_finalized()))
            .collect();
        assert_eq!(ids, vec![("a", false), ("b", true)]);
    }

    #[test]
    fn test_message_text_concatenates_text_units() {
        let mut msg = Message::assistant_text("Hello, ");
        msg.units.push(Unit::ToolInvocation(ToolInvocation::requested(
            "x",
            "t",
            Value::Null,
        )));
        msg.units.push(Unit::Text {
            text: "world".to_string(),
        });
        assert_eq!(msg.text(), "Hello, world");
    }
}

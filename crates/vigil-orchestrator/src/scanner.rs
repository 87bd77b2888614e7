//! Trace scanner.
//!
//! Validates the trace as a whole, then classifies the invocation units of
//! the last message in one pass. Earlier messages are history: they are only
//! checked, never classified.

use std::collections::HashMap;

use tracing::debug;
use vigil_core::{Decision, InvocationStatus, Trace};
use vigil_tools::ToolRegistry;

use crate::error::ProtocolViolation;

/// A confirmation-required unit of the last message that has no outcome yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    /// Unit index within the last message.
    pub index: usize,
    /// Call id.
    pub call_id: String,
    /// The human decision, from the slot or the decision map. `None` blocks.
    pub decision: Option<Decision>,
}

/// Classification of the last message's invocation units, by unit index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Units that already hold a real payload.
    pub resolved: Vec<usize>,
    /// Confirmation-required units without a payload.
    pub pending_confirmation: Vec<PendingConfirmation>,
    /// Auto-executing units without a payload.
    pub pending_auto: Vec<usize>,
}

impl ScanReport {
    /// Confirmation units that carry a decision and can be resolved now.
    pub fn decided(&self) -> impl Iterator<Item = (&PendingConfirmation, Decision)> {
        self.pending_confirmation
            .iter()
            .filter_map(|p| p.decision.map(|d| (p, d)))
    }

    /// Call ids still waiting for a human.
    #[must_use]
    pub fn awaiting(&self) -> Vec<String> {
        self.pending_confirmation
            .iter()
            .filter(|p| p.decision.is_none())
            .map(|p| p.call_id.clone())
            .collect()
    }

    /// Whether nothing in the last message needs work.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.pending_confirmation.is_empty() && self.pending_auto.is_empty()
    }
}

/// Validate `trace` and `decisions` and classify the last message.
///
/// A decision aimed at a unit that already holds a payload is accepted and
/// ignored, so a finalized trace can be resent with its decisions.
///
/// # Errors
///
/// Returns the first [`ProtocolViolation`] found.
pub fn scan(
    trace: &Trace,
    registry: &ToolRegistry,
    decisions: &HashMap<String, Decision>,
) -> Result<ScanReport, ProtocolViolation> {
    let last_index = trace.len().saturating_sub(1);

    // Call id -> (message index, finalized).
    let mut seen: HashMap<&str, (usize, bool)> = HashMap::new();
    for (message_index, message) in trace.messages().iter().enumerate() {
        for inv in message.invocations() {
            if seen
                .insert(&inv.call_id, (message_index, inv.is_finalized()))
                .is_some()
            {
                return Err(ProtocolViolation::DuplicateCallId {
                    call_id: inv.call_id.clone(),
                });
            }
            // A payload is terminal whatever the status says; never run it again.
            if inv.outcome().is_some() && inv.status == InvocationStatus::Requested {
                return Err(ProtocolViolation::OutcomeWithoutResolvedStatus {
                    call_id: inv.call_id.clone(),
                });
            }
            if message_index != last_index && inv.decision().is_some() {
                return Err(ProtocolViolation::StaleDecision {
                    call_id: inv.call_id.clone(),
                    message_index,
                });
            }
        }
    }

    let mut targets: Vec<&String> = decisions.keys().collect();
    targets.sort_unstable();
    for call_id in targets {
        match seen.get(call_id.as_str()) {
            None => {
                return Err(ProtocolViolation::UnknownDecisionTarget {
                    call_id: call_id.clone(),
                });
            },
            Some(&(message_index, finalized)) if message_index != last_index && !finalized => {
                return Err(ProtocolViolation::StaleDecision {
                    call_id: call_id.clone(),
                    message_index,
                });
            },
            Some(_) => {},
        }
    }

    let mut report = ScanReport::default();
    let Some(last) = trace.last() else {
        return Ok(report);
    };

    for (index, unit) in last.units.iter().enumerate() {
        let Some(inv) = unit.as_invocation() else {
            continue;
        };
        if inv.is_finalized() {
            report.resolved.push(index);
            continue;
        }

        let slot = inv.decision();
        let supplied = decisions.get(&inv.call_id).copied();

        if !registry.requires_confirmation(&inv.tool_name) {
            if slot.is_some() || supplied.is_some() {
                return Err(ProtocolViolation::DecisionForAutoTool {
                    call_id: inv.call_id.clone(),
                    tool_name: inv.tool_name.clone(),
                });
            }
            report.pending_auto.push(index);
            continue;
        }

        if slot.is_some() && inv.status == InvocationStatus::Requested {
            return Err(ProtocolViolation::DecisionWithoutResolvedStatus {
                call_id: inv.call_id.clone(),
            });
        }
        let decision = match (slot, supplied) {
            (Some(a), Some(b)) if a != b => {
                return Err(ProtocolViolation::ConflictingDecision {
                    call_id: inv.call_id.clone(),
                });
            },
            (a, b) => a.or(b),
        };
        report.pending_confirmation.push(PendingConfirmation {
            index,
            call_id: inv.call_id.clone(),
            decision,
        });
    }

    debug!(
        resolved = report.resolved.len(),
        pending_confirmation = report.pending_confirmation.len(),
        pending_auto = report.pending_auto.len(),
        "trace scanned"
    );
    Ok(report)
}

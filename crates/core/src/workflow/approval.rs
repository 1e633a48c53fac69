//! Approval-gate evaluation.
//!
//! Pure evaluation of approval gates against tallies of still-valid,
//! approved responses. The persistence layer produces the tallies; this
//! module decides whether a gated transition may fire. It produces no
//! side effects.

use serde_json::{Map, Value};

use crate::workflow::config::ApprovalGate;
use crate::workflow::error::EngineError;
use crate::workflow::types::{ApprovalResponse, ApprovalType};

/// Metadata key carrying the approval response on a process event.
pub const APPROVAL_RESPONSE_KEY: &str = "approval_response";

/// Count of distinct approved responses for one approval type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalTally {
    /// The approval type counted.
    pub approval_type: ApprovalType,
    /// Distinct approving users with a still-valid approved response.
    pub approved_count: u32,
}

/// Stateless evaluator for approval gates.
pub struct ApprovalEvaluator;

impl ApprovalEvaluator {
    /// Returns true once every gate's required count is met.
    ///
    /// A gate with no matching tally counts as zero approvals. States
    /// with no gates are trivially satisfied.
    #[must_use]
    pub fn gates_satisfied(gates: &[ApprovalGate], tallies: &[ApprovalTally]) -> bool {
        gates.iter().all(|gate| {
            let approved = tallies
                .iter()
                .find(|t| t.approval_type == gate.approval_type)
                .map_or(0, |t| t.approved_count);
            approved >= gate.required_approvals
        })
    }

    /// Resolves the approval response type from event metadata.
    ///
    /// # Errors
    ///
    /// Fails non-retryably when the key is missing, not a string, or
    /// outside the known enumeration: such an event will never become
    /// valid.
    pub fn resolve_response(
        metadata: &Map<String, Value>,
    ) -> Result<ApprovalResponse, EngineError> {
        let raw = metadata
            .get(APPROVAL_RESPONSE_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EngineError::InvalidApprovalResponse(format!(
                    "metadata key {APPROVAL_RESPONSE_KEY} is missing or not a string"
                ))
            })?;

        ApprovalResponse::parse(raw)
            .ok_or_else(|| EngineError::InvalidApprovalResponse(raw.to_string()))
    }
}

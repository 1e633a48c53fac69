//! Declarative per-kind workflow configuration.
//!
//! A [`WorkflowConfig`] names the governed entity kind, the multiplicity
//! rule, and the ordered approval gates attached to each state. It is
//! pure data, validated against its paired state machine at registration
//! time.

use crate::workflow::error::DefinitionError;
use crate::workflow::machine::StateMachine;
use crate::workflow::types::{ApprovalType, EntityKind, WorkflowKind};

/// A named N-of-M approval requirement on one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalGate {
    /// The approval type counted toward this gate.
    pub approval_type: ApprovalType,
    /// Distinct approved responses required before the gate opens.
    pub required_approvals: u32,
}

/// Declarative configuration for one workflow kind.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// The workflow kind this config belongs to.
    pub kind: WorkflowKind,
    /// The entity kind instances of this workflow govern.
    pub entity_kind: EntityKind,
    /// Ordered approval gates per state. States without an entry are
    /// ungated.
    pub approvals: Vec<(&'static str, Vec<ApprovalGate>)>,
    /// Whether one entity may have several active instances of this kind.
    pub allow_multiple_active: bool,
}

impl WorkflowConfig {
    /// Returns the gates declared for `state`, empty when ungated.
    #[must_use]
    pub fn gates_for(&self, state: &str) -> &[ApprovalGate] {
        self.approvals
            .iter()
            .find(|(s, _)| *s == state)
            .map_or(&[], |(_, gates)| gates.as_slice())
    }

    /// Validates this config against its paired machine.
    ///
    /// Every state named in the approval map must be a declared state of
    /// the machine, and every gate must require at least one approval.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`]; registration treats this as fatal.
    pub fn validate_against(&self, machine: &StateMachine) -> Result<(), DefinitionError> {
        for (state, gates) in &self.approvals {
            if !machine.states().contains(state) {
                return Err(DefinitionError::ApprovalStateUndeclared((*state).to_string()));
            }
            if gates.iter().any(|g| g.required_approvals == 0) {
                return Err(DefinitionError::EmptyApprovalGate((*state).to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::machine::{Transition, TransitionGuard};

    fn two_state_machine() -> StateMachine {
        StateMachine::new(
            vec!["open", "closed"],
            "open",
            vec!["closed"],
            vec![Transition {
                source: "open",
                event: "close",
                target: "closed",
                guard: TransitionGuard::ApprovalsSatisfied,
                follow_up: None,
            }],
        )
        .unwrap()
    }

    fn config_with(approvals: Vec<(&'static str, Vec<ApprovalGate>)>) -> WorkflowConfig {
        WorkflowConfig {
            kind: WorkflowKind::OpportunityPublish,
            entity_kind: EntityKind::Opportunity,
            approvals,
            allow_multiple_active: false,
        }
    }

    #[test]
    fn test_gates_for_declared_state() {
        let gate = ApprovalGate {
            approval_type: ApprovalType::OpportunityPublishBasic,
            required_approvals: 3,
        };
        let config = config_with(vec![("open", vec![gate])]);
        assert_eq!(config.gates_for("open"), &[gate]);
        assert!(config.gates_for("closed").is_empty());
    }

    #[test]
    fn test_validate_accepts_declared_states() {
        let config = config_with(vec![(
            "open",
            vec![ApprovalGate {
                approval_type: ApprovalType::OpportunityPublishBasic,
                required_approvals: 1,
            }],
        )]);
        assert!(config.validate_against(&two_state_machine()).is_ok());
    }

    #[test]
    fn test_validate_rejects_undeclared_state() {
        let config = config_with(vec![(
            "limbo",
            vec![ApprovalGate {
                approval_type: ApprovalType::OpportunityPublishBasic,
                required_approvals: 1,
            }],
        )]);
        assert_eq!(
            config.validate_against(&two_state_machine()).unwrap_err(),
            DefinitionError::ApprovalStateUndeclared("limbo".into())
        );
    }

    #[test]
    fn test_validate_rejects_zero_requirement() {
        let config = config_with(vec![(
            "open",
            vec![ApprovalGate {
                approval_type: ApprovalType::OpportunityPublishBasic,
                required_approvals: 0,
            }],
        )]);
        assert_eq!(
            config.validate_against(&two_state_machine()).unwrap_err(),
            DefinitionError::EmptyApprovalGate("open".into())
        );
    }
}

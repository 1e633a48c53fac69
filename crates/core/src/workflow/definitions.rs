//! The standard workflow definitions.
//!
//! Each definition pairs a [`WorkflowConfig`] with its state machine.
//! [`standard_registry`] is the deterministically ordered registration
//! list the worker builds its registry from at startup.

use crate::workflow::config::{ApprovalGate, WorkflowConfig};
use crate::workflow::error::DefinitionError;
use crate::workflow::machine::{StateMachine, Transition, TransitionGuard};
use crate::workflow::registry::WorkflowRegistry;
use crate::workflow::types::{ApprovalType, EntityKind, WorkflowKind};

/// Builds the registry with every standard definition registered.
///
/// # Errors
///
/// Returns a [`DefinitionError`] if any definition is inconsistent;
/// callers treat this as fatal at startup.
pub fn standard_registry() -> Result<WorkflowRegistry, DefinitionError> {
    let mut registry = WorkflowRegistry::new();

    let (config, machine) = opportunity_publish()?;
    registry.register(config, machine)?;

    let (config, machine) = application_review()?;
    registry.register(config, machine)?;

    Ok(registry)
}

/// Publication approval for a funding opportunity.
///
/// Once the third basic approval lands, the approve event cascades
/// through `approved` straight to `published`.
///
/// # Errors
///
/// Returns a [`DefinitionError`] if the declaration is inconsistent.
pub fn opportunity_publish() -> Result<(WorkflowConfig, StateMachine), DefinitionError> {
    let machine = StateMachine::new(
        vec![
            "draft",
            "receive_approval",
            "approved",
            "published",
            "rejected",
        ],
        "draft",
        vec!["published", "rejected"],
        vec![
            Transition {
                source: "draft",
                event: "submit",
                target: "receive_approval",
                guard: TransitionGuard::None,
                follow_up: None,
            },
            Transition {
                source: "receive_approval",
                event: "approve",
                target: "approved",
                guard: TransitionGuard::ApprovalsSatisfied,
                follow_up: Some("publish"),
            },
            Transition {
                source: "receive_approval",
                event: "reject",
                target: "rejected",
                guard: TransitionGuard::None,
                follow_up: None,
            },
            Transition {
                source: "approved",
                event: "publish",
                target: "published",
                guard: TransitionGuard::None,
                follow_up: None,
            },
        ],
    )?;

    let config = WorkflowConfig {
        kind: WorkflowKind::OpportunityPublish,
        entity_kind: EntityKind::Opportunity,
        approvals: vec![(
            "receive_approval",
            vec![ApprovalGate {
                approval_type: ApprovalType::OpportunityPublishBasic,
                required_approvals: 3,
            }],
        )],
        allow_multiple_active: false,
    };

    Ok((config, machine))
}

/// Review of a submitted application.
///
/// # Errors
///
/// Returns a [`DefinitionError`] if the declaration is inconsistent.
pub fn application_review() -> Result<(WorkflowConfig, StateMachine), DefinitionError> {
    let machine = StateMachine::new(
        vec!["submitted", "in_review", "accepted", "declined"],
        "submitted",
        vec!["accepted", "declined"],
        vec![
            Transition {
                source: "submitted",
                event: "assign",
                target: "in_review",
                guard: TransitionGuard::None,
                follow_up: None,
            },
            Transition {
                source: "in_review",
                event: "accept",
                target: "accepted",
                guard: TransitionGuard::ApprovalsSatisfied,
                follow_up: None,
            },
            Transition {
                source: "in_review",
                event: "decline",
                target: "declined",
                guard: TransitionGuard::None,
                follow_up: None,
            },
        ],
    )?;

    let config = WorkflowConfig {
        kind: WorkflowKind::ApplicationReview,
        entity_kind: EntityKind::Application,
        approvals: vec![(
            "in_review",
            vec![ApprovalGate {
                approval_type: ApprovalType::ApplicationReviewBasic,
                required_approvals: 2,
            }],
        )],
        allow_multiple_active: false,
    };

    Ok((config, machine))
}

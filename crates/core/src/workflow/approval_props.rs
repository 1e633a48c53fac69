//! Property-based tests for approval-gate evaluation.

use proptest::prelude::*;

use crate::workflow::approval::{ApprovalEvaluator, ApprovalTally};
use crate::workflow::config::ApprovalGate;
use crate::workflow::types::ApprovalType;

/// Strategy for generating random approval types.
fn arb_approval_type() -> impl Strategy<Value = ApprovalType> {
    prop_oneof![
        Just(ApprovalType::OpportunityPublishBasic),
        Just(ApprovalType::ApplicationReviewBasic),
    ]
}

fn arb_gates() -> impl Strategy<Value = Vec<ApprovalGate>> {
    prop::collection::vec(
        (arb_approval_type(), 1u32..10).prop_map(|(approval_type, required_approvals)| {
            ApprovalGate {
                approval_type,
                required_approvals,
            }
        }),
        0..3,
    )
}

fn arb_tallies() -> impl Strategy<Value = Vec<ApprovalTally>> {
    prop::collection::vec(
        (arb_approval_type(), 0u32..12).prop_map(|(approval_type, approved_count)| {
            ApprovalTally {
                approval_type,
                approved_count,
            }
        }),
        0..3,
    )
}

fn count_for(tallies: &[ApprovalTally], approval_type: ApprovalType) -> u32 {
    tallies
        .iter()
        .find(|t| t.approval_type == approval_type)
        .map_or(0, |t| t.approved_count)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The evaluator agrees with the definition: every gate's first
    /// matching tally meets its required count.
    #[test]
    fn prop_satisfied_matches_definition(gates in arb_gates(), tallies in arb_tallies()) {
        let expected = gates
            .iter()
            .all(|g| count_for(&tallies, g.approval_type) >= g.required_approvals);
        prop_assert_eq!(
            ApprovalEvaluator::gates_satisfied(&gates, &tallies),
            expected
        );
    }

    /// Raising approved counts never closes an open gate.
    #[test]
    fn prop_more_approvals_is_monotone(gates in arb_gates(), tallies in arb_tallies()) {
        if ApprovalEvaluator::gates_satisfied(&gates, &tallies) {
            let raised: Vec<ApprovalTally> = tallies
                .iter()
                .map(|t| ApprovalTally {
                    approval_type: t.approval_type,
                    approved_count: t.approved_count + 1,
                })
                .collect();
            prop_assert!(ApprovalEvaluator::gates_satisfied(&gates, &raised));
        }
    }

    /// Exactly at the boundary: required - 1 blocks, required admits.
    #[test]
    fn prop_boundary(approval_type in arb_approval_type(), required in 1u32..10) {
        let gates = [ApprovalGate {
            approval_type,
            required_approvals: required,
        }];
        let below = [ApprovalTally {
            approval_type,
            approved_count: required - 1,
        }];
        let at = [ApprovalTally {
            approval_type,
            approved_count: required,
        }];
        prop_assert!(!ApprovalEvaluator::gates_satisfied(&gates, &below));
        prop_assert!(ApprovalEvaluator::gates_satisfied(&gates, &at));
    }
}

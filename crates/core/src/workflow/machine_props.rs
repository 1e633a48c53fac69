//! Property-based tests for the state-machine interpreter.
//!
//! These validate the structural invariants of event dispatch using
//! proptest for randomized input generation.

use proptest::prelude::*;

use crate::workflow::definitions;
use crate::workflow::error::EngineError;
use crate::workflow::machine::StateMachine;

fn standard_machines() -> Vec<StateMachine> {
    vec![
        definitions::opportunity_publish().unwrap().1,
        definitions::application_review().unwrap().1,
    ]
}

/// Strategy selecting one of the standard machines.
fn arb_machine() -> impl Strategy<Value = StateMachine> {
    let machines = standard_machines();
    (0..machines.len()).prop_map(move |i| machines[i].clone())
}

/// Strategy for event names: mostly declared events, sometimes noise.
fn arb_event() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop_oneof![
            Just("submit"), Just("approve"), Just("reject"), Just("publish"),
            Just("assign"), Just("accept"), Just("decline"),
        ].prop_map(str::to_string),
        1 => "[a-z]{1,12}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Whatever happens, the machine never leaves its declared state set
    /// and never reports more transitions than the depth bound.
    #[test]
    fn prop_send_stays_within_declared_states(
        machine in arb_machine(),
        state_index in 0usize..5,
        event in arb_event(),
        gate_open in any::<bool>(),
        max_depth in 1u32..8,
    ) {
        let states = machine.states().to_vec();
        let state = states[state_index % states.len()];

        match machine.send(state, &event, max_depth, |_| Ok(gate_open)) {
            Ok(outcome) => {
                prop_assert!(states.contains(&outcome.final_state));
                prop_assert!(outcome.records.len() <= max_depth as usize);
            }
            Err(
                EngineError::MalformedEvent(_)
                | EngineError::InvalidTransition { .. }
                | EngineError::Invariant(_),
            ) => {}
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// Traversed edges form a contiguous chain from the current state,
    /// with depth 0 attributed to the external event and every later
    /// edge marked automatic.
    #[test]
    fn prop_records_form_contiguous_chain(
        machine in arb_machine(),
        state_index in 0usize..5,
        event in arb_event(),
    ) {
        let states = machine.states().to_vec();
        let state = states[state_index % states.len()];

        if let Ok(outcome) = machine.send(state, &event, 25, |_| Ok(true)) {
            let mut expected_source = state;
            for (i, record) in outcome.records.iter().enumerate() {
                prop_assert_eq!(record.depth as usize, i);
                prop_assert_eq!(record.source, expected_source);
                prop_assert_eq!(record.automatic, i > 0);
                expected_source = record.target;
            }
            if !outcome.records.is_empty() {
                prop_assert_eq!(outcome.final_state, expected_source);
            }
        }
    }

    /// A closed gate is a no-op, never an error: state unchanged, zero
    /// transitions reported.
    #[test]
    fn prop_closed_gate_is_noop(machine in arb_machine()) {
        for state in machine.states().to_vec() {
            for event in ["approve", "accept"] {
                if machine.edge(state, event).is_some() {
                    let outcome = machine.send(state, event, 25, |_| Ok(false)).unwrap();
                    prop_assert_eq!(outcome.final_state, state);
                    prop_assert!(outcome.records.is_empty());
                }
            }
        }
    }
}

//! State-machine interpreter.
//!
//! A [`StateMachine`] is an explicit transition table
//! `(state, event) -> (target, guard, follow_up)` validated at
//! construction. Sending an event walks one edge and then applies any
//! configured follow-up events from each reached state, so a single
//! external event can cascade through several states within one unit of
//! work. The cascade is bounded: exceeding the configured depth is a
//! retryable invariant violation rather than an infinite loop.

use crate::workflow::error::{DefinitionError, EngineError};

/// Guard evaluated before an edge may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionGuard {
    /// The edge always fires.
    None,
    /// The edge fires only once the source state's approval gates are
    /// satisfied.
    ApprovalsSatisfied,
}

/// One edge of the transition table.
#[derive(Debug, Clone)]
pub struct Transition {
    /// State the edge leaves.
    pub source: &'static str,
    /// Event that drives the edge.
    pub event: &'static str,
    /// State the edge enters.
    pub target: &'static str,
    /// Guard consulted before firing.
    pub guard: TransitionGuard,
    /// Event automatically fired from the target state, if any.
    pub follow_up: Option<&'static str>,
}

/// One traversed edge, reported in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Zero-based position within the cascade. Depth 0 is the
    /// user-triggered transition; every later record is automatic.
    pub depth: u32,
    /// The event that fired the edge.
    pub event: &'static str,
    /// The state the edge left.
    pub source: &'static str,
    /// The state the edge entered.
    pub target: &'static str,
    /// Whether the edge was fired by a follow-up rather than the
    /// external event.
    pub automatic: bool,
}

/// Result of driving one external event through the machine.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The state the workflow ends in. Unchanged when no edge fired.
    pub final_state: &'static str,
    /// Whether the final state is terminal.
    pub terminal: bool,
    /// Every edge traversed, in order. Empty when a gate held the event
    /// back.
    pub records: Vec<TransitionRecord>,
}

/// A validated workflow state machine.
///
/// Exactly one initial state and one or more terminal states. Every
/// transition references declared states only, and every follow-up event
/// has an edge from its transition's target state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    states: Vec<&'static str>,
    initial: &'static str,
    terminals: Vec<&'static str>,
    transitions: Vec<Transition>,
}

impl StateMachine {
    /// Builds a machine from its declared states and transition table.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] when the declaration is internally
    /// inconsistent; registration treats this as fatal.
    pub fn new(
        states: Vec<&'static str>,
        initial: &'static str,
        terminals: Vec<&'static str>,
        transitions: Vec<Transition>,
    ) -> Result<Self, DefinitionError> {
        for (i, state) in states.iter().enumerate() {
            if states[..i].contains(state) {
                return Err(DefinitionError::DuplicateState((*state).to_string()));
            }
        }

        if !states.contains(&initial) {
            return Err(DefinitionError::UnknownInitialState(initial.to_string()));
        }

        if terminals.is_empty() {
            return Err(DefinitionError::NoTerminalState);
        }
        for terminal in &terminals {
            if !states.contains(terminal) {
                return Err(DefinitionError::UnknownTerminalState((*terminal).to_string()));
            }
        }

        for (i, t) in transitions.iter().enumerate() {
            for state in [t.source, t.target] {
                if !states.contains(&state) {
                    return Err(DefinitionError::UndeclaredState {
                        event: t.event.to_string(),
                        state: state.to_string(),
                    });
                }
            }
            if transitions[..i]
                .iter()
                .any(|prev| prev.source == t.source && prev.event == t.event)
            {
                return Err(DefinitionError::DuplicateTransition {
                    state: t.source.to_string(),
                    event: t.event.to_string(),
                });
            }
        }

        // Every follow-up must have an edge from the target it fires from,
        // so a cascade can never dead-end on a missing edge at runtime.
        for t in &transitions {
            if let Some(follow_up) = t.follow_up
                && !transitions
                    .iter()
                    .any(|next| next.source == t.target && next.event == follow_up)
            {
                return Err(DefinitionError::FollowUpWithoutEdge {
                    state: t.target.to_string(),
                    follow_up: follow_up.to_string(),
                });
            }
        }

        Ok(Self {
            states,
            initial,
            terminals,
            transitions,
        })
    }

    /// Returns the single initial state.
    #[must_use]
    pub const fn initial_state(&self) -> &'static str {
        self.initial
    }

    /// Returns the declared states in declaration order.
    #[must_use]
    pub fn states(&self) -> &[&'static str] {
        &self.states
    }

    /// Returns the transition table in declaration order.
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Returns true if `state` is terminal.
    #[must_use]
    pub fn is_terminal(&self, state: &str) -> bool {
        self.terminals.contains(&state)
    }

    /// Maps a persisted state name back onto the declared state set.
    ///
    /// # Errors
    ///
    /// Returns a retryable invariant violation for names outside the
    /// declared set: a row in an undeclared state means a stale read or a
    /// configuration rolled out mid-flight.
    pub fn resolve_state(&self, name: &str) -> Result<&'static str, EngineError> {
        self.states
            .iter()
            .find(|s| **s == name)
            .copied()
            .ok_or_else(|| {
                EngineError::Invariant(format!("state {name} is not declared for this machine"))
            })
    }

    /// Returns the edge for `(state, event)`, if declared.
    #[must_use]
    pub fn edge(&self, state: &str, event: &str) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.source == state && t.event == event)
    }

    /// Returns true if any edge is driven by `event`.
    #[must_use]
    pub fn declares_event(&self, event: &str) -> bool {
        self.transitions.iter().any(|t| t.event == event)
    }

    /// Drives one external event, following the cascade of follow-up
    /// events until none is configured, a gate holds, or a terminal state
    /// is reached.
    ///
    /// `gates_open` is consulted once per guarded edge; returning `false`
    /// stops the walk without error, so a gated event that is not yet
    /// fully approved simply produces no transitions.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MalformedEvent`] when no edge anywhere is driven
    ///   by `event` (the event can never become valid).
    /// - [`EngineError::InvalidTransition`] (retryable) when the event is
    ///   declared but not allowed from `current_state`.
    /// - [`EngineError::Invariant`] (retryable) when the cascade exceeds
    ///   `max_depth` or `current_state` is not a declared state.
    /// - Whatever `gates_open` returns, propagated unchanged.
    pub fn send<G>(
        &self,
        current_state: &str,
        event: &str,
        max_depth: u32,
        mut gates_open: G,
    ) -> Result<SendOutcome, EngineError>
    where
        G: FnMut(&Transition) -> Result<bool, EngineError>,
    {
        let mut state = self.resolve_state(current_state)?;

        if !self.declares_event(event) {
            return Err(EngineError::MalformedEvent(format!(
                "event {event} is not declared by this machine"
            )));
        }

        let Some(first) = self.edge(state, event) else {
            return Err(EngineError::InvalidTransition {
                state: state.to_string(),
                event: event.to_string(),
            });
        };

        let mut records = Vec::new();
        let mut edge = first;
        let mut depth: u32 = 0;

        loop {
            if depth >= max_depth {
                return Err(EngineError::Invariant(format!(
                    "cascade exceeded {max_depth} transitions from state {current_state}"
                )));
            }

            if edge.guard == TransitionGuard::ApprovalsSatisfied && !gates_open(edge)? {
                break;
            }

            records.push(TransitionRecord {
                depth,
                event: edge.event,
                source: edge.source,
                target: edge.target,
                automatic: depth > 0,
            });
            state = edge.target;
            depth += 1;

            if self.is_terminal(state) {
                break;
            }

            match edge.follow_up {
                // Validated at construction, so the edge always exists.
                Some(follow_up) => match self.edge(state, follow_up) {
                    Some(next) => edge = next,
                    None => {
                        return Err(EngineError::Invariant(format!(
                            "follow-up {follow_up} has no edge from state {state}"
                        )));
                    }
                },
                None => break,
            }
        }

        Ok(SendOutcome {
            final_state: state,
            terminal: self.is_terminal(state),
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish_machine() -> StateMachine {
        StateMachine::new(
            vec!["draft", "receive_approval", "approved", "published", "rejected"],
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
        )
        .unwrap()
    }

    fn open_gates(_: &Transition) -> Result<bool, EngineError> {
        Ok(true)
    }

    fn closed_gates(_: &Transition) -> Result<bool, EngineError> {
        Ok(false)
    }

    #[test]
    fn test_simple_transition() {
        let machine = publish_machine();
        let outcome = machine.send("draft", "submit", 25, open_gates).unwrap();
        assert_eq!(outcome.final_state, "receive_approval");
        assert!(!outcome.terminal);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].depth, 0);
        assert!(!outcome.records[0].automatic);
    }

    #[test]
    fn test_cascade_through_follow_up() {
        let machine = publish_machine();
        let outcome = machine
            .send("receive_approval", "approve", 25, open_gates)
            .unwrap();
        assert_eq!(outcome.final_state, "published");
        assert!(outcome.terminal);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].event, "approve");
        assert!(!outcome.records[0].automatic);
        assert_eq!(outcome.records[1].event, "publish");
        assert!(outcome.records[1].automatic);
        assert_eq!(outcome.records[1].depth, 1);
    }

    #[test]
    fn test_closed_gate_produces_no_transitions() {
        let machine = publish_machine();
        let outcome = machine
            .send("receive_approval", "approve", 25, closed_gates)
            .unwrap();
        assert_eq!(outcome.final_state, "receive_approval");
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn test_gate_error_propagates() {
        let machine = publish_machine();
        let result = machine.send("receive_approval", "approve", 25, |_| {
            Err(EngineError::Database("gate lookup failed".into()))
        });
        assert!(matches!(result, Err(EngineError::Database(_))));
    }

    #[test]
    fn test_undeclared_event_is_malformed() {
        let machine = publish_machine();
        let result = machine.send("draft", "frobnicate", 25, open_gates);
        assert!(matches!(result, Err(EngineError::MalformedEvent(_))));
    }

    #[test]
    fn test_declared_event_from_wrong_state_is_invalid_transition() {
        let machine = publish_machine();
        let result = machine.send("draft", "approve", 25, open_gates);
        match result {
            Err(EngineError::InvalidTransition { state, event }) => {
                assert_eq!(state, "draft");
                assert_eq!(event, "approve");
            }
            other => panic!("Expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_current_state_is_invariant() {
        let machine = publish_machine();
        let result = machine.send("limbo", "submit", 25, open_gates);
        assert!(matches!(result, Err(EngineError::Invariant(_))));
    }

    #[test]
    fn test_cascade_depth_bound() {
        // Two states ping-ponging via follow-ups never terminate; the
        // bound must convert that into an error.
        let machine = StateMachine::new(
            vec!["a", "b", "end"],
            "a",
            vec!["end"],
            vec![
                Transition {
                    source: "a",
                    event: "go",
                    target: "b",
                    guard: TransitionGuard::None,
                    follow_up: Some("back"),
                },
                Transition {
                    source: "b",
                    event: "back",
                    target: "a",
                    guard: TransitionGuard::None,
                    follow_up: Some("go"),
                },
            ],
        )
        .unwrap();

        let result = machine.send("a", "go", 10, open_gates);
        assert!(matches!(result, Err(EngineError::Invariant(_))));
    }

    #[test]
    fn test_rejects_duplicate_state() {
        let result = StateMachine::new(vec!["a", "a"], "a", vec!["a"], vec![]);
        assert_eq!(result.unwrap_err(), DefinitionError::DuplicateState("a".into()));
    }

    #[test]
    fn test_rejects_unknown_initial() {
        let result = StateMachine::new(vec!["a"], "b", vec!["a"], vec![]);
        assert_eq!(
            result.unwrap_err(),
            DefinitionError::UnknownInitialState("b".into())
        );
    }

    #[test]
    fn test_rejects_missing_terminal() {
        let result = StateMachine::new(vec!["a"], "a", vec![], vec![]);
        assert_eq!(result.unwrap_err(), DefinitionError::NoTerminalState);
    }

    #[test]
    fn test_rejects_undeclared_transition_state() {
        let result = StateMachine::new(
            vec!["a", "b"],
            "a",
            vec!["b"],
            vec![Transition {
                source: "a",
                event: "go",
                target: "c",
                guard: TransitionGuard::None,
                follow_up: None,
            }],
        );
        assert!(matches!(
            result.unwrap_err(),
            DefinitionError::UndeclaredState { .. }
        ));
    }

    #[test]
    fn test_rejects_duplicate_edge() {
        let edge = Transition {
            source: "a",
            event: "go",
            target: "b",
            guard: TransitionGuard::None,
            follow_up: None,
        };
        let result = StateMachine::new(vec!["a", "b"], "a", vec!["b"], vec![edge.clone(), edge]);
        assert!(matches!(
            result.unwrap_err(),
            DefinitionError::DuplicateTransition { .. }
        ));
    }

    #[test]
    fn test_rejects_dangling_follow_up() {
        let result = StateMachine::new(
            vec!["a", "b", "c"],
            "a",
            vec!["c"],
            vec![Transition {
                source: "a",
                event: "go",
                target: "b",
                guard: TransitionGuard::None,
                follow_up: Some("missing"),
            }],
        );
        assert!(matches!(
            result.unwrap_err(),
            DefinitionError::FollowUpWithoutEdge { .. }
        ));
    }

    #[test]
    fn test_terminal_state_stops_cascade() {
        // The reject edge enters a terminal state; no follow-up applies.
        let machine = publish_machine();
        let outcome = machine
            .send("receive_approval", "reject", 25, open_gates)
            .unwrap();
        assert_eq!(outcome.final_state, "rejected");
        assert!(outcome.terminal);
        assert_eq!(outcome.records.len(), 1);
    }
}

//! Graphviz rendering of registered state machines.
//!
//! Developer-only: documentation tooling renders each registered machine
//! to an image. The runtime never calls this.

use std::fmt::Write;

use crate::workflow::machine::{StateMachine, TransitionGuard};
use crate::workflow::registry::WorkflowRegistry;
use crate::workflow::types::WorkflowKind;

/// Renders one machine as a Graphviz digraph.
///
/// Terminal states are drawn with a double border, gated edges dashed,
/// and follow-up events annotated on their edge label.
#[must_use]
pub fn machine_to_dot(kind: WorkflowKind, machine: &StateMachine) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {} {{", kind.as_str());
    let _ = writeln!(out, "    rankdir=LR;");
    let _ = writeln!(out, "    node [shape=box, style=rounded];");

    for state in machine.states() {
        if machine.is_terminal(state) {
            let _ = writeln!(out, "    {state} [peripheries=2];");
        } else if *state == machine.initial_state() {
            let _ = writeln!(out, "    {state} [style=\"rounded,bold\"];");
        }
    }

    for edge in machine.transitions() {
        let mut label = edge.event.to_string();
        if let Some(follow_up) = edge.follow_up {
            let _ = write!(label, " / {follow_up}");
        }
        let style = match edge.guard {
            TransitionGuard::None => "solid",
            TransitionGuard::ApprovalsSatisfied => "dashed",
        };
        let _ = writeln!(
            out,
            "    {} -> {} [label=\"{label}\", style={style}];",
            edge.source, edge.target
        );
    }

    let _ = writeln!(out, "}}");
    out
}

/// Renders every registered machine, in registry order.
#[must_use]
pub fn registry_to_dot(registry: &WorkflowRegistry) -> Vec<(WorkflowKind, String)> {
    registry
        .kinds()
        .filter_map(|kind| {
            registry
                .lookup(kind)
                .ok()
                .map(|entry| (kind, machine_to_dot(kind, &entry.machine)))
        })
        .collect()
}

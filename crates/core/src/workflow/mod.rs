//! Workflow orchestration engine for Granary.
//!
//! This module implements the per-kind workflow state machines, the
//! startup-time registry, approval-gate evaluation, and the inbound
//! event envelope.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (kinds, approval types, responses)
//! - `error` - Engine error taxonomy (retryable vs non-retryable)
//! - `machine` - State-machine interpreter with cascade support
//! - `config` - Declarative per-kind workflow and approval configuration
//! - `registry` - Write-once-at-startup kind registry
//! - `definitions` - The standard workflow definitions
//! - `envelope` - Inbound event envelope and validation
//! - `approval` - Approval-gate evaluation
//! - `dot` - Developer-only Graphviz rendering of registered machines

pub mod approval;
pub mod config;
pub mod definitions;
pub mod dot;
pub mod envelope;
pub mod error;
pub mod machine;
pub mod registry;
pub mod types;

#[cfg(test)]
mod approval_props;
#[cfg(test)]
mod machine_props;

pub use approval::{ApprovalEvaluator, ApprovalTally};
pub use config::{ApprovalGate, WorkflowConfig};
pub use envelope::{
    EntityRef, EventAction, EventEnvelope, EventType, ProcessWorkflowContext,
    StartWorkflowContext,
};
pub use error::{DefinitionError, EngineError};
pub use machine::{SendOutcome, StateMachine, Transition, TransitionGuard, TransitionRecord};
pub use registry::{WorkflowEntry, WorkflowRegistry};
pub use types::{ApprovalResponse, ApprovalType, EntityKind, WorkflowKind};

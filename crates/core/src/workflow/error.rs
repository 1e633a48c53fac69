//! Engine error taxonomy.
//!
//! Every processing failure falls into one of two families: retryable
//! errors leave the triggering event on the queue for redelivery,
//! non-retryable errors dead-letter it immediately. The ingestion loop
//! keys its redeliver-vs-dead-letter decision on [`EngineError::is_retryable`].

use thiserror::Error;

use granary_shared::types::{EntityId, UserId, WorkflowId};

/// Errors that can occur while processing one workflow event.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An engine invariant was violated, possibly due to a stale read.
    #[error("Engine invariant violated: {0}")]
    Invariant(String),

    /// A workflow kind is known but has no registered configuration.
    #[error("Missing configuration for workflow kind {0}")]
    MissingConfiguration(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The event does not match its declared schema.
    #[error("Malformed event envelope: {0}")]
    MalformedEvent(String),

    /// The event names a workflow kind outside the known enumeration.
    #[error("Unknown workflow kind: {0}")]
    UnknownWorkflowKind(String),

    /// The event references a workflow that does not exist.
    #[error("Workflow {0} not found")]
    WorkflowNotFound(WorkflowId),

    /// A workflow row is attached to the wrong number of entities.
    #[error(
        "Entity not found for workflow {workflow_id}: expected exactly one \
         {entity_kind} reference, found {found}"
    )]
    EntityCardinality {
        /// The workflow whose binding failed.
        workflow_id: WorkflowId,
        /// The entity kind the workflow's config declares.
        entity_kind: String,
        /// How many entity references were actually attached.
        found: usize,
    },

    /// The event's acting user does not exist.
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// The event targets a workflow that has already reached a terminal state.
    #[error("Workflow {0} is not active")]
    InactiveWorkflow(WorkflowId),

    /// The event's metadata carries a missing or unknown approval response.
    #[error("Invalid approval response: {0}")]
    InvalidApprovalResponse(String),

    /// A start event targets an entity that already has an active workflow.
    #[error("Active {workflow_kind} workflow already exists for entity {entity_id}")]
    DuplicateActiveWorkflow {
        /// The governed entity.
        entity_id: EntityId,
        /// The conflicting workflow kind.
        workflow_kind: String,
    },

    /// The event is not allowed from the workflow's current state.
    #[error("Event {event} is not allowed from state {state}")]
    InvalidTransition {
        /// The workflow's current state.
        state: String,
        /// The rejected event.
        event: String,
    },
}

impl EngineError {
    /// Returns true if redelivering the triggering event may succeed.
    ///
    /// Retryable failures are engine-invariant violations (possibly caused
    /// by a stale read), missing per-kind configuration, and transient
    /// database errors. Everything else indicates the event will never
    /// become valid.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Invariant(_)
                | Self::MissingConfiguration(_)
                | Self::Database(_)
                | Self::InvalidTransition { .. }
        )
    }

    /// Returns the stable error code for logs and dead-letter records.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Invariant(_) => "INVARIANT_VIOLATION",
            Self::MissingConfiguration(_) => "MISSING_CONFIGURATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::MalformedEvent(_) => "MALFORMED_EVENT",
            Self::UnknownWorkflowKind(_) => "UNKNOWN_WORKFLOW_KIND",
            Self::WorkflowNotFound(_) => "WORKFLOW_NOT_FOUND",
            Self::EntityCardinality { .. } => "ENTITY_CARDINALITY",
            Self::UnknownUser(_) => "UNKNOWN_USER",
            Self::InactiveWorkflow(_) => "INACTIVE_WORKFLOW",
            Self::InvalidApprovalResponse(_) => "INVALID_APPROVAL_RESPONSE",
            Self::DuplicateActiveWorkflow { .. } => "DUPLICATE_ACTIVE_WORKFLOW",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}

/// Errors raised while building a state machine or registering a workflow
/// kind at startup. These are fatal: the process refuses to start.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// A state appears twice in the declared state list.
    #[error("State {0} is declared twice")]
    DuplicateState(String),

    /// The declared initial state is not in the state list.
    #[error("Initial state {0} is not a declared state")]
    UnknownInitialState(String),

    /// The machine declares no terminal state.
    #[error("State machine declares no terminal state")]
    NoTerminalState,

    /// A terminal state is not in the state list.
    #[error("Terminal state {0} is not a declared state")]
    UnknownTerminalState(String),

    /// A transition references a state outside the declared list.
    #[error("Transition {event} references undeclared state {state}")]
    UndeclaredState {
        /// The offending transition's event name.
        event: String,
        /// The undeclared state.
        state: String,
    },

    /// Two transitions share the same (state, event) pair.
    #[error("Duplicate transition for ({state}, {event})")]
    DuplicateTransition {
        /// Source state of the colliding edges.
        state: String,
        /// Event name of the colliding edges.
        event: String,
    },

    /// A follow-up event has no edge from the transition's target state.
    #[error("Follow-up event {follow_up} has no edge from state {state}")]
    FollowUpWithoutEdge {
        /// Target state the follow-up would fire from.
        state: String,
        /// The dangling follow-up event.
        follow_up: String,
    },

    /// An approval gate names a state the paired machine does not declare.
    #[error("Approval gate references undeclared state {0}")]
    ApprovalStateUndeclared(String),

    /// An approval gate requires zero approvals.
    #[error("Approval gate for state {0} requires zero approvals")]
    EmptyApprovalGate(String),

    /// The same workflow kind was registered twice.
    #[error("Workflow kind {0} is already registered")]
    DuplicateRegistration(String),
}

//! Transactional event processor.
//!
//! One queued event is resolved, validated, and driven through its
//! workflow's state machine inside a single database transaction. Any
//! failure rolls the whole unit of work back, including already-applied
//! cascading transitions, and surfaces an [`EngineError`] whose family
//! decides redelivery versus dead-letter.

use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde_json::{Value, json};
use tracing::{debug, warn};

use granary_core::workflow::{
    ApprovalEvaluator, ApprovalResponse, EngineError, EntityKind, EventAction, EventEnvelope,
    EventType, ProcessWorkflowContext, StartWorkflowContext, WorkflowKind, WorkflowRegistry,
};
use granary_shared::types::{EntityId, EventId, UserId, WorkflowId};

use crate::repositories::{
    ApprovalRepository, AuditRepository, EventHistoryRepository, SYSTEM_WORKFLOW_USER_ID,
    UserRepository, WorkflowBinding, WorkflowRepository,
};

/// Summary of one successfully processed event.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    /// The event's identifier.
    pub event_id: EventId,
    /// Kind of event processed.
    pub event_type: EventType,
    /// The workflow the event acted on (or created).
    pub workflow_id: WorkflowId,
    /// The user the event acted on behalf of.
    pub acting_user_id: UserId,
    /// Number of transition edges traversed.
    pub transitions: usize,
    /// The workflow's state after commit.
    pub final_state: String,
    /// Whether the workflow reached a terminal state.
    pub terminal: bool,
}

/// Drives one event through resolution, interpretation, and audit inside
/// a transaction.
#[derive(Debug, Clone)]
pub struct EventProcessor {
    db: DatabaseConnection,
    registry: Arc<WorkflowRegistry>,
    max_cascade_depth: u32,
}

impl EventProcessor {
    /// Creates a new processor.
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        registry: Arc<WorkflowRegistry>,
        max_cascade_depth: u32,
    ) -> Self {
        Self {
            db,
            registry,
            max_cascade_depth,
        }
    }

    /// Processes one raw queue payload.
    ///
    /// Envelope deserialization and schema validation run before the
    /// transaction opens; everything that touches workflow state commits
    /// or rolls back as one unit.
    ///
    /// # Errors
    ///
    /// Returns the [`EngineError`] that aborted the event; the caller
    /// settles the queue row according to its retryable family.
    pub async fn process(&self, payload: &Value) -> Result<ProcessedEvent, EngineError> {
        let envelope = EventEnvelope::from_payload(payload)?;
        envelope.action()?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        match self.apply(&txn, &envelope, payload).await {
            Ok(processed) => {
                txn.commit()
                    .await
                    .map_err(|e| EngineError::Database(e.to_string()))?;
                Ok(processed)
            }
            Err(error) => {
                if let Err(rollback) = txn.rollback().await {
                    // The original error stays the primary failure.
                    warn!(error = %rollback, "rollback after processing failure also failed");
                }
                Err(error)
            }
        }
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        envelope: &EventEnvelope,
        payload: &Value,
    ) -> Result<ProcessedEvent, EngineError> {
        UserRepository::require(txn, envelope.acting_user_id).await?;

        match envelope.action()? {
            EventAction::Start(context) => self.start_workflow(txn, envelope, context, payload).await,
            EventAction::Process(context) => {
                self.process_workflow(txn, envelope, context, payload).await
            }
        }
    }

    /// Creates a new workflow instance when no conflicting active one
    /// exists.
    async fn start_workflow(
        &self,
        txn: &DatabaseTransaction,
        envelope: &EventEnvelope,
        context: &StartWorkflowContext,
        payload: &Value,
    ) -> Result<ProcessedEvent, EngineError> {
        let (kind, entry) = self.registry.resolve(&context.workflow_type)?;

        let mut entities: Vec<(EntityKind, EntityId)> = Vec::with_capacity(context.entities.len());
        for reference in &context.entities {
            let entity_kind = EntityKind::parse(&reference.entity_type).ok_or_else(|| {
                EngineError::MalformedEvent(format!(
                    "unknown entity type {}",
                    reference.entity_type
                ))
            })?;
            if entity_kind != entry.config.entity_kind {
                return Err(EngineError::MalformedEvent(format!(
                    "workflow kind {kind} governs {} entities, got {entity_kind}",
                    entry.config.entity_kind
                )));
            }
            entities.push((entity_kind, reference.entity_id));
        }

        if !entry.config.allow_multiple_active {
            for (entity_kind, entity_id) in &entities {
                // Serialize concurrent starts for the same entity; the
                // lock releases with the transaction.
                WorkflowRepository::lock_entity(txn, *entity_id).await?;
                let existing =
                    WorkflowRepository::find_active_for_entity(txn, kind, *entity_kind, *entity_id)
                        .await?;
                if existing.is_some() {
                    return Err(EngineError::DuplicateActiveWorkflow {
                        entity_id: *entity_id,
                        workflow_kind: kind.to_string(),
                    });
                }
            }
        }

        let workflow =
            WorkflowRepository::create(txn, kind, entry.machine.initial_state(), &entities).await?;
        let workflow_id = WorkflowId::from_uuid(workflow.id);

        EventHistoryRepository::append(txn, envelope.event_id, workflow_id, payload.clone())
            .await?;

        debug!(%workflow_id, %kind, state = %workflow.current_state, "workflow started");

        Ok(ProcessedEvent {
            event_id: envelope.event_id,
            event_type: EventType::StartWorkflow,
            workflow_id,
            acting_user_id: envelope.acting_user_id,
            transitions: 0,
            terminal: entry.machine.is_terminal(&workflow.current_state),
            final_state: workflow.current_state,
        })
    }

    /// Drives an event through an existing workflow, including its
    /// cascade, writing one audit row per traversed edge.
    async fn process_workflow(
        &self,
        txn: &DatabaseTransaction,
        envelope: &EventEnvelope,
        context: &ProcessWorkflowContext,
        payload: &Value,
    ) -> Result<ProcessedEvent, EngineError> {
        // The row lock keeps a second worker off this workflow until the
        // transaction settles, so a cascade is never interleaved.
        let workflow = WorkflowRepository::require_for_update(txn, context.workflow_id).await?;
        if !workflow.is_active {
            return Err(EngineError::InactiveWorkflow(context.workflow_id));
        }

        let kind = WorkflowKind::parse(&workflow.workflow_kind).ok_or_else(|| {
            EngineError::Invariant(format!(
                "workflow row carries unknown kind {}",
                workflow.workflow_kind
            ))
        })?;
        let entry = self.registry.lookup(kind)?;

        let binding = WorkflowBinding::load(txn, workflow, &entry.config).await?;
        let workflow_id = binding.workflow_id();

        EventHistoryRepository::append(txn, envelope.event_id, workflow_id, payload.clone())
            .await?;

        // An event arriving at a gated state must carry a valid approval
        // response in its metadata.
        let gated = !entry
            .config
            .gates_for(&binding.workflow.current_state)
            .is_empty();
        let response = if gated {
            Some(ApprovalEvaluator::resolve_response(&envelope.metadata)?)
        } else {
            None
        };

        let tallies =
            ApprovalRepository::tallies_for_config(txn, workflow_id, &entry.config).await?;

        let outcome = entry.machine.send(
            &binding.workflow.current_state,
            &context.event_to_send,
            self.max_cascade_depth,
            |transition| {
                Ok(ApprovalEvaluator::gates_satisfied(
                    entry.config.gates_for(transition.source),
                    &tallies,
                ))
            },
        )?;

        for record in &outcome.records {
            let actor = if record.depth == 0 {
                envelope.acting_user_id.into_inner()
            } else {
                SYSTEM_WORKFLOW_USER_ID
            };
            let metadata = if record.automatic {
                json!({
                    "automatic": true,
                    "note": format!("auto-transition following {}", context.event_to_send),
                })
            } else {
                match response {
                    Some(resp) => json!({"automatic": false, "approval_response": resp.as_str()}),
                    None => json!({"automatic": false}),
                }
            };
            AuditRepository::record(txn, workflow_id, envelope.event_id, actor, record, metadata)
                .await?;

            debug!(
                %workflow_id,
                event = record.event,
                source = record.source,
                target = record.target,
                depth = record.depth,
                "transition applied"
            );
        }

        // Approvals behind a gate that fired are spent; invalidate them in
        // the same transaction so a redelivery cannot reuse them.
        if response == Some(ApprovalResponse::Approve) {
            for record in &outcome.records {
                for gate in entry.config.gates_for(record.source) {
                    ApprovalRepository::consume(txn, workflow_id, gate.approval_type).await?;
                }
            }
        }

        let transitions = outcome.records.len();
        let final_state = if transitions > 0 {
            let updated = WorkflowRepository::update_state(
                txn,
                binding.workflow,
                outcome.final_state,
                outcome.terminal,
            )
            .await?;
            updated.current_state
        } else {
            binding.workflow.current_state
        };

        Ok(ProcessedEvent {
            event_id: envelope.event_id,
            event_type: EventType::ProcessWorkflow,
            workflow_id,
            acting_user_id: envelope.acting_user_id,
            transitions,
            final_state,
            terminal: outcome.terminal,
        })
    }
}

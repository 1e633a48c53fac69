//! Workflow instance persistence.
//!
//! Creation enforces the single-active-instance rule inside the caller's
//! transaction; state updates deactivate the row once a terminal state
//! is reached.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, JoinType, QueryFilter,
    QuerySelect, RelationTrait, Set, Statement,
};
use uuid::Uuid;

use granary_core::workflow::{EngineError, EntityKind, WorkflowKind};
use granary_shared::types::{EntityId, WorkflowId};

use crate::entities::{workflow_entities, workflows};

/// Repository for workflow rows and their entity references.
pub struct WorkflowRepository;

impl WorkflowRepository {
    /// Loads a workflow by id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on query failure.
    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        workflow_id: WorkflowId,
    ) -> Result<Option<workflows::Model>, EngineError> {
        workflows::Entity::find_by_id(workflow_id.into_inner())
            .one(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    /// Loads a workflow by id, failing non-retryably when absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WorkflowNotFound`] for missing rows.
    pub async fn require<C: ConnectionTrait>(
        conn: &C,
        workflow_id: WorkflowId,
    ) -> Result<workflows::Model, EngineError> {
        Self::find(conn, workflow_id)
            .await?
            .ok_or(EngineError::WorkflowNotFound(workflow_id))
    }

    /// Loads a workflow by id, holding a row lock for the rest of the
    /// transaction.
    ///
    /// The workflow row is the contended resource between workers: the
    /// lock keeps a second worker from running a cascade for the same
    /// workflow until this transaction settles.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WorkflowNotFound`] for missing rows.
    pub async fn require_for_update<C: ConnectionTrait>(
        conn: &C,
        workflow_id: WorkflowId,
    ) -> Result<workflows::Model, EngineError> {
        workflows::Entity::find_by_id(workflow_id.into_inner())
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?
            .ok_or(EngineError::WorkflowNotFound(workflow_id))
    }

    /// Serializes workflow creation for one entity within the caller's
    /// transaction via an advisory lock, so two concurrent start events
    /// cannot both pass the single-active-instance check.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on query failure.
    pub async fn lock_entity<C: ConnectionTrait>(
        conn: &C,
        entity_id: EntityId,
    ) -> Result<(), EngineError> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0));",
            [entity_id.to_string().into()],
        );
        conn.execute(statement)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;
        Ok(())
    }

    /// Finds an active workflow of `kind` governing the given entity.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on query failure.
    pub async fn find_active_for_entity<C: ConnectionTrait>(
        conn: &C,
        kind: WorkflowKind,
        entity_kind: EntityKind,
        entity_id: EntityId,
    ) -> Result<Option<workflows::Model>, EngineError> {
        workflows::Entity::find()
            .join(
                JoinType::InnerJoin,
                workflows::Relation::WorkflowEntities.def(),
            )
            .filter(workflows::Column::WorkflowKind.eq(kind.as_str()))
            .filter(workflows::Column::IsActive.eq(true))
            .filter(workflow_entities::Column::EntityKind.eq(entity_kind.as_str()))
            .filter(workflow_entities::Column::EntityId.eq(entity_id.into_inner()))
            .one(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    /// Creates a workflow in its initial state with its entity references.
    ///
    /// The caller has already checked the multiplicity rule; both inserts
    /// run on the caller's connection so they share its transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on insert failure.
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        kind: WorkflowKind,
        initial_state: &str,
        entities: &[(EntityKind, EntityId)],
    ) -> Result<workflows::Model, EngineError> {
        let now = Utc::now().into();
        let workflow = workflows::ActiveModel {
            id: Set(Uuid::now_v7()),
            workflow_kind: Set(kind.as_str().to_string()),
            current_state: Set(initial_state.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let workflow = workflow
            .insert(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        for (entity_kind, entity_id) in entities {
            let reference = workflow_entities::ActiveModel {
                id: Set(Uuid::now_v7()),
                workflow_id: Set(workflow.id),
                entity_kind: Set(entity_kind.as_str().to_string()),
                entity_id: Set(entity_id.into_inner()),
                created_at: Set(now),
            };
            reference
                .insert(conn)
                .await
                .map_err(|e| EngineError::Database(e.to_string()))?;
        }

        Ok(workflow)
    }

    /// Moves a workflow to `new_state`, deactivating it when terminal.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on update failure.
    pub async fn update_state<C: ConnectionTrait>(
        conn: &C,
        workflow: workflows::Model,
        new_state: &str,
        terminal: bool,
    ) -> Result<workflows::Model, EngineError> {
        let mut active: workflows::ActiveModel = workflow.into();
        active.current_state = Set(new_state.to_string());
        active.is_active = Set(!terminal);
        active.updated_at = Set(Utc::now().into());

        active
            .update(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }
}

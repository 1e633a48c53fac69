//! Persistence-model adapter.
//!
//! A [`WorkflowBinding`] bridges a generic workflow row to the concrete
//! domain entity it governs, exposing the entity through a typed,
//! engine-agnostic surface. This is the only seam through which the
//! engine touches domain objects; it never inspects opportunity or
//! application internals directly.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use granary_core::workflow::{EngineError, WorkflowConfig};
use granary_shared::types::{EntityId, WorkflowId};

use crate::entities::{workflow_entities, workflows};

/// A workflow row bound to its single governed entity reference.
#[derive(Debug, Clone)]
pub struct WorkflowBinding {
    /// The workflow row.
    pub workflow: workflows::Model,
    entity: workflow_entities::Model,
}

impl WorkflowBinding {
    /// Loads the binding for a single-entity config.
    ///
    /// # Errors
    ///
    /// Fails non-retryably with [`EngineError::EntityCardinality`] when
    /// zero or more than one reference of the config's entity kind is
    /// attached, and with [`EngineError::Database`] on query failure.
    pub async fn load<C: ConnectionTrait>(
        conn: &C,
        workflow: workflows::Model,
        config: &WorkflowConfig,
    ) -> Result<Self, EngineError> {
        let mut references: Vec<workflow_entities::Model> = workflow_entities::Entity::find()
            .filter(workflow_entities::Column::WorkflowId.eq(workflow.id))
            .filter(workflow_entities::Column::EntityKind.eq(config.entity_kind.as_str()))
            .all(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        if references.len() != 1 {
            return Err(EngineError::EntityCardinality {
                workflow_id: WorkflowId::from_uuid(workflow.id),
                entity_kind: config.entity_kind.to_string(),
                found: references.len(),
            });
        }

        // len() == 1 was just checked
        let entity = references
            .pop()
            .ok_or_else(|| EngineError::Invariant("entity reference vanished".into()))?;

        Ok(Self { workflow, entity })
    }

    /// Returns the bound workflow's id.
    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        WorkflowId::from_uuid(self.workflow.id)
    }

    /// Returns the governed entity's id.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        EntityId::from_uuid(self.entity.entity_id)
    }

    /// Returns the governed entity's kind name.
    #[must_use]
    pub fn entity_kind(&self) -> &str {
        &self.entity.entity_kind
    }
}

//! Append-only audit trail writes.
//!
//! One row is written per transition edge traversed, including cascading
//! edges. A write failure propagates to the caller and aborts the
//! surrounding transaction; it is never swallowed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use granary_core::workflow::{EngineError, TransitionRecord};
use granary_shared::types::{EventId, WorkflowId};

use crate::entities::workflow_audits;

/// Repository for audit records.
pub struct AuditRepository;

impl AuditRepository {
    /// Writes the audit row for one traversed edge.
    ///
    /// The caller passes the actor explicitly: the event's acting user
    /// for the first edge, the system workflow user for every cascading
    /// edge after it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on insert failure.
    pub async fn record<C: ConnectionTrait>(
        conn: &C,
        workflow_id: WorkflowId,
        event_id: EventId,
        acting_user_id: Uuid,
        record: &TransitionRecord,
        metadata: serde_json::Value,
    ) -> Result<workflow_audits::Model, EngineError> {
        let row = workflow_audits::ActiveModel {
            id: Set(Uuid::now_v7()),
            workflow_id: Set(workflow_id.into_inner()),
            event_id: Set(event_id.into_inner()),
            acting_user_id: Set(acting_user_id),
            transition_event: Set(record.event.to_string()),
            source_state: Set(record.source.to_string()),
            target_state: Set(record.target.to_string()),
            metadata: Set(metadata),
            created_at: Set(Utc::now().into()),
        };

        row.insert(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    /// Returns the audit rows written for one event, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on query failure.
    pub async fn for_event<C: ConnectionTrait>(
        conn: &C,
        event_id: EventId,
    ) -> Result<Vec<workflow_audits::Model>, EngineError> {
        workflow_audits::Entity::find()
            .filter(workflow_audits::Column::EventId.eq(event_id.into_inner()))
            .order_by_asc(workflow_audits::Column::Id)
            .all(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }
}

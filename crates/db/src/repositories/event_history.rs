//! Append-only event history writes.
//!
//! One row per accepted external event. Rows are never mutated or
//! deleted; a rollback of the surrounding transaction is the only way a
//! row disappears.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};

use granary_core::workflow::EngineError;
use granary_shared::types::{EventId, WorkflowId};

use crate::entities::workflow_event_history;

/// Repository for the accepted-event record.
pub struct EventHistoryRepository;

impl EventHistoryRepository {
    /// Appends the record for one accepted event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on insert failure.
    pub async fn append<C: ConnectionTrait>(
        conn: &C,
        event_id: EventId,
        workflow_id: WorkflowId,
        event_data: serde_json::Value,
    ) -> Result<workflow_event_history::Model, EngineError> {
        let row = workflow_event_history::ActiveModel {
            event_id: Set(event_id.into_inner()),
            workflow_id: Set(workflow_id.into_inner()),
            event_data: Set(event_data),
            sent_at: Set(Utc::now().into()),
        };

        row.insert(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }
}

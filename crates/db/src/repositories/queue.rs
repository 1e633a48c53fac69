//! Polled event queue.
//!
//! The queue is a Postgres table written by the external enqueue path.
//! Workers claim batches with `FOR UPDATE SKIP LOCKED`, which keeps two
//! workers off the same row, and every claim pushes `available_at`
//! forward so a crashed worker's events resurface after the visibility
//! window.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbBackend, FromQueryResult, Set, Statement,
};
use uuid::Uuid;

use granary_core::workflow::EngineError;

use crate::entities::queued_events;

/// Queue row status: waiting for delivery.
pub const STATUS_PENDING: &str = "pending";
/// Queue row status: processed successfully.
pub const STATUS_DONE: &str = "done";
/// Queue row status: permanently failed.
pub const STATUS_DEAD: &str = "dead";

/// What happened to a failed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDisposition {
    /// Left on the queue for another delivery attempt.
    Redelivered,
    /// Permanently failed.
    DeadLettered,
}

const CLAIM_SQL: &str = r"
UPDATE queued_events
SET available_at = now() + ($2::bigint * interval '1 second'),
    attempts = attempts + 1,
    updated_at = now()
WHERE id IN (
    SELECT id FROM queued_events
    WHERE status = 'pending' AND available_at <= now()
    ORDER BY created_at
    LIMIT $1
    FOR UPDATE SKIP LOCKED
)
RETURNING *;
";

/// Repository for the polled event queue.
#[derive(Debug, Clone)]
pub struct QueueRepository {
    db: DatabaseConnection,
}

impl QueueRepository {
    /// Creates a new queue repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Enqueues a raw event payload.
    ///
    /// Production enqueueing belongs to the external API path; the
    /// worker's integration tests use this to feed the loop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on insert failure.
    pub async fn enqueue(
        &self,
        payload: serde_json::Value,
    ) -> Result<queued_events::Model, EngineError> {
        let now = Utc::now().into();
        let row = queued_events::ActiveModel {
            id: Set(Uuid::now_v7()),
            payload: Set(payload),
            status: Set(STATUS_PENDING.to_string()),
            attempts: Set(0),
            available_at: Set(now),
            last_error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        row.insert(&self.db)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    /// Claims up to `limit` deliverable events.
    ///
    /// Claimed rows stay `pending` but become invisible for
    /// `visibility_secs`, so an event is redelivered automatically if the
    /// worker dies before settling it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on query failure.
    pub async fn claim_batch(
        &self,
        limit: u32,
        visibility_secs: u64,
    ) -> Result<Vec<queued_events::Model>, EngineError> {
        let visibility = i64::try_from(visibility_secs).unwrap_or(i64::MAX);
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            CLAIM_SQL,
            [i64::from(limit).into(), visibility.into()],
        );

        queued_events::Model::find_by_statement(statement)
            .all(&self.db)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    /// Marks an event as processed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on update failure.
    pub async fn mark_done(&self, event: queued_events::Model) -> Result<(), EngineError> {
        let mut active: queued_events::ActiveModel = event.into();
        active.status = Set(STATUS_DONE.to_string());
        active.last_error = Set(None);
        active.updated_at = Set(Utc::now().into());

        active
            .update(&self.db)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;
        Ok(())
    }

    /// Settles a retryable failure: redelivery with backoff while
    /// attempts remain, dead-letter once they are exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on update failure.
    pub async fn redeliver(
        &self,
        event: queued_events::Model,
        backoff_secs: u64,
        max_attempts: u32,
        error: &str,
    ) -> Result<QueueDisposition, EngineError> {
        if event.attempts >= i32::try_from(max_attempts).unwrap_or(i32::MAX) {
            self.dead_letter(event, error).await?;
            return Ok(QueueDisposition::DeadLettered);
        }

        let now = Utc::now();
        let backoff = chrono::Duration::seconds(i64::try_from(backoff_secs).unwrap_or(i64::MAX));
        let mut active: queued_events::ActiveModel = event.into();
        active.available_at = Set((now + backoff).into());
        active.last_error = Set(Some(error.to_string()));
        active.updated_at = Set(now.into());

        active
            .update(&self.db)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;
        Ok(QueueDisposition::Redelivered)
    }

    /// Permanently fails an event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on update failure.
    pub async fn dead_letter(
        &self,
        event: queued_events::Model,
        error: &str,
    ) -> Result<(), EngineError> {
        let mut active: queued_events::ActiveModel = event.into();
        active.status = Set(STATUS_DEAD.to_string());
        active.last_error = Set(Some(error.to_string()));
        active.updated_at = Set(Utc::now().into());

        active
            .update(&self.db)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;
        Ok(())
    }
}

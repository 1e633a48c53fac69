//! User read model access.
//!
//! The engine never writes users; it resolves the acting user of an
//! event and the well-known system workflow user that automatic
//! transitions are attributed to.

use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use granary_core::workflow::EngineError;
use granary_shared::types::UserId;

use crate::entities::users;

/// Fixed identifier of the system workflow user, seeded by migration.
pub const SYSTEM_WORKFLOW_USER_ID: Uuid = Uuid::from_u128(1);

/// Repository for user lookups.
pub struct UserRepository;

impl UserRepository {
    /// Loads a user, failing non-retryably when the row does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownUser`] for missing users and
    /// [`EngineError::Database`] on query failure.
    pub async fn require<C: ConnectionTrait>(
        conn: &C,
        user_id: UserId,
    ) -> Result<users::Model, EngineError> {
        users::Entity::find_by_id(user_id.into_inner())
            .one(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?
            .ok_or(EngineError::UnknownUser(user_id))
    }

    /// Loads the system workflow user.
    ///
    /// # Errors
    ///
    /// A missing row is a retryable invariant violation: the seed is part
    /// of the schema and its absence means a half-applied deployment.
    pub async fn system_workflow_user<C: ConnectionTrait>(
        conn: &C,
    ) -> Result<users::Model, EngineError> {
        users::Entity::find_by_id(SYSTEM_WORKFLOW_USER_ID)
            .one(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?
            .ok_or_else(|| EngineError::Invariant("system workflow user is not seeded".into()))
    }
}

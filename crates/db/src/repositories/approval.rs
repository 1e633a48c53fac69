//! Approval record access and gate tallies.
//!
//! Approval rows are written by the external submission path; the engine
//! reads still-valid approved responses to evaluate gates and
//! invalidates them once a gated transition has consumed them.

use std::collections::HashSet;

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use granary_core::workflow::{
    ApprovalResponse, ApprovalTally, ApprovalType, EngineError, WorkflowConfig,
};
use granary_shared::types::{UserId, WorkflowId};

use crate::entities::workflow_approvals;

/// Repository for approval records.
pub struct ApprovalRepository;

impl ApprovalRepository {
    /// Returns still-valid approved rows for (workflow, approval type),
    /// optionally filtered by approving user.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on query failure.
    pub async fn valid_approvals<C: ConnectionTrait>(
        conn: &C,
        workflow_id: WorkflowId,
        approval_type: ApprovalType,
        approving_user: Option<UserId>,
    ) -> Result<Vec<workflow_approvals::Model>, EngineError> {
        let mut query = workflow_approvals::Entity::find()
            .filter(workflow_approvals::Column::WorkflowId.eq(workflow_id.into_inner()))
            .filter(workflow_approvals::Column::ApprovalType.eq(approval_type.as_str()))
            .filter(workflow_approvals::Column::ResponseType.eq(ApprovalResponse::Approve.as_str()))
            .filter(workflow_approvals::Column::IsStillValid.eq(true));

        if let Some(user) = approving_user {
            query = query
                .filter(workflow_approvals::Column::ApprovingUserId.eq(user.into_inner()));
        }

        query
            .all(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    /// Tallies distinct approving users per approval type named by the
    /// config's gates.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on query failure.
    pub async fn tallies_for_config<C: ConnectionTrait>(
        conn: &C,
        workflow_id: WorkflowId,
        config: &WorkflowConfig,
    ) -> Result<Vec<ApprovalTally>, EngineError> {
        let mut approval_types: Vec<ApprovalType> = config
            .approvals
            .iter()
            .flat_map(|(_, gates)| gates.iter().map(|g| g.approval_type))
            .collect();
        let mut seen = HashSet::new();
        approval_types.retain(|t| seen.insert(*t));

        let mut tallies = Vec::with_capacity(approval_types.len());
        for approval_type in approval_types {
            let rows = Self::valid_approvals(conn, workflow_id, approval_type, None).await?;
            let distinct: HashSet<Uuid> = rows.iter().map(|r| r.approving_user_id).collect();
            tallies.push(ApprovalTally {
                approval_type,
                approved_count: u32::try_from(distinct.len()).unwrap_or(u32::MAX),
            });
        }

        Ok(tallies)
    }

    /// Invalidates every still-valid row of one approval type.
    ///
    /// Called in the same transaction as the gated transition that
    /// consumed the approvals, so a redelivered event cannot double-spend
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on update failure.
    pub async fn consume<C: ConnectionTrait>(
        conn: &C,
        workflow_id: WorkflowId,
        approval_type: ApprovalType,
    ) -> Result<u64, EngineError> {
        let result = workflow_approvals::Entity::update_many()
            .col_expr(
                workflow_approvals::Column::IsStillValid,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(workflow_approvals::Column::WorkflowId.eq(workflow_id.into_inner()))
            .filter(workflow_approvals::Column::ApprovalType.eq(approval_type.as_str()))
            .filter(workflow_approvals::Column::IsStillValid.eq(true))
            .exec(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Records an approval response row.
    ///
    /// The engine itself never calls this in production (the submission
    /// path owns approval creation), but integration tests use it to
    /// arrange gate states.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Database`] on insert failure.
    pub async fn record<C: ConnectionTrait>(
        conn: &C,
        workflow_id: WorkflowId,
        event_id: Uuid,
        approval_type: ApprovalType,
        approving_user: UserId,
        response: ApprovalResponse,
    ) -> Result<workflow_approvals::Model, EngineError> {
        let row = workflow_approvals::ActiveModel {
            id: Set(Uuid::now_v7()),
            workflow_id: Set(workflow_id.into_inner()),
            event_id: Set(event_id),
            approval_type: Set(approval_type.as_str().to_string()),
            approving_user_id: Set(approving_user.into_inner()),
            response_type: Set(response.as_str().to_string()),
            is_still_valid: Set(true),
            created_at: Set(chrono::Utc::now().into()),
        };

        row.insert(conn)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }
}

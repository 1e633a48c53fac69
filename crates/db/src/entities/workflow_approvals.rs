//! `SeaORM` Entity for the workflow_approvals table.
//!
//! Rows are created by the external approval-submission path and
//! consumed (`is_still_valid` set false) once a gated transition acts on
//! them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "workflow_approvals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub event_id: Uuid,
    pub approval_type: String,
    pub approving_user_id: Uuid,
    pub response_type: String,
    pub is_still_valid: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workflows::Entity",
        from = "Column::WorkflowId",
        to = "super::workflows::Column::Id"
    )]
    Workflows,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ApprovingUserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::workflows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workflows.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

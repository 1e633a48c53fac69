//! `SeaORM` Entity for the workflows table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "workflows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workflow_kind: String,
    pub current_state: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::workflow_entities::Entity")]
    WorkflowEntities,
    #[sea_orm(has_many = "super::workflow_audits::Entity")]
    WorkflowAudits,
    #[sea_orm(has_many = "super::workflow_approvals::Entity")]
    WorkflowApprovals,
    #[sea_orm(has_many = "super::workflow_event_history::Entity")]
    WorkflowEventHistory,
}

impl Related<super::workflow_entities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkflowEntities.def()
    }
}

impl Related<super::workflow_audits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkflowAudits.def()
    }
}

impl Related<super::workflow_approvals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkflowApprovals.def()
    }
}

impl Related<super::workflow_event_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkflowEventHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

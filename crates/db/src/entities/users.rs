//! `SeaORM` Entity for the users read model.
//!
//! The engine only reads users: the acting user of an event and the
//! well-known system workflow user that cascading transitions are
//! attributed to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub is_system: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::workflow_audits::Entity")]
    WorkflowAudits,
    #[sea_orm(has_many = "super::workflow_approvals::Entity")]
    WorkflowApprovals,
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

impl ActiveModelBehavior for ActiveModel {}

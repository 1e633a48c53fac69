//! `SeaORM` Entity for the queued_events table.
//!
//! The polled queue the ingestion loop consumes. Rows are written by the
//! external enqueue path; the worker claims them with
//! `FOR UPDATE SKIP LOCKED`, then marks them done, redelivers them, or
//! dead-letters them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "queued_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub payload: Json,
    pub status: String,
    pub attempts: i32,
    pub available_at: DateTimeWithTimeZone,
    pub last_error: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

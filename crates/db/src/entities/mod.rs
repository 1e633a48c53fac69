//! `SeaORM` entity definitions for the workflow tables.

pub mod queued_events;
pub mod users;
pub mod workflow_approvals;
pub mod workflow_audits;
pub mod workflow_entities;
pub mod workflow_event_history;
pub mod workflows;

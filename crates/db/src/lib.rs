//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the workflow tables
//! - Repository abstractions for data access
//! - The transactional event processor
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod processor;
pub mod repositories;

pub use processor::{EventProcessor, ProcessedEvent};
pub use repositories::QueueRepository;

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

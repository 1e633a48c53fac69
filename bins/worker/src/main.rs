//! Granary event ingestion worker.
//!
//! Polls the event queue and drives each event through the workflow
//! engine, one event at a time, until a termination signal arrives.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use granary_core::workflow::definitions::standard_registry;
use granary_db::{EventProcessor, QueueRepository, connect};
use granary_shared::AppConfig;

use crate::ingest::IngestLoop;

mod ingest;
mod traced;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "granary=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    // Build the workflow registry from the startup registration list
    let registry = Arc::new(standard_registry()?);
    info!(kinds = registry.len(), "Workflow registry built");

    // Wire the queue and the processor
    let queue = QueueRepository::new(db.clone());
    let processor = EventProcessor::new(db, registry, config.worker.max_cascade_depth);

    // Run the ingestion loop until a termination signal
    let ingest = IngestLoop::new(queue, processor, config.worker);
    ingest.run().await?;

    info!("Worker stopped");
    Ok(())
}

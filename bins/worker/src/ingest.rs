//! The event ingestion loop.
//!
//! Single-threaded cooperative polling: claim a batch, process each
//! event in its own transaction, settle the queue row per the error
//! family, sleep, repeat. SIGINT exits immediately; SIGTERM sets a flag
//! checked only between polling iterations so an in-flight batch always
//! finishes before exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use tokio::time::sleep;
use tracing::{error, info, warn};

use granary_db::entities::queued_events;
use granary_db::repositories::QueueDisposition;
use granary_db::{EventProcessor, QueueRepository};
use granary_shared::config::WorkerConfig;

use crate::traced;

/// Seconds a claimed event stays invisible before resurfacing if the
/// worker dies mid-processing.
const CLAIM_VISIBILITY_SECS: u64 = 300;

/// The polling loop driving the event processor.
pub struct IngestLoop {
    queue: QueueRepository,
    processor: EventProcessor,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl IngestLoop {
    /// Creates a new loop.
    #[must_use]
    pub fn new(queue: QueueRepository, processor: EventProcessor, config: WorkerConfig) -> Self {
        Self {
            queue,
            processor,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs until SIGINT, SIGTERM, or signal-handler setup failure.
    ///
    /// # Errors
    ///
    /// Returns an error only when the signal handlers cannot be
    /// installed; processing failures are settled per event.
    pub async fn run(self) -> std::io::Result<()> {
        // SIGTERM only sets the flag: the in-flight batch always finishes,
        // which is the grace-period contract the hosting orchestrator
        // relies on before its hard kill.
        let mut sigterm = signal(SignalKind::terminate())?;
        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            if sigterm.recv().await.is_some() {
                info!("Received SIGTERM, will exit after the in-flight batch");
                shutdown.store(true, Ordering::SeqCst);
            }
        });

        let mut sigint = signal(SignalKind::interrupt())?;

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            batch_size = self.config.batch_size,
            "Ingestion loop started"
        );

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown flag set, exiting ingestion loop");
                break;
            }

            // SIGINT aborts the tick immediately; an open transaction is
            // rolled back server-side when its connection drops.
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, exiting immediately");
                    break;
                }
                () = self.tick() => {}
            }
        }

        Ok(())
    }

    /// One polling iteration: claim a batch and process it, or sleep
    /// when the queue is empty.
    async fn tick(&self) {
        let batch = match self
            .queue
            .claim_batch(self.config.batch_size, CLAIM_VISIBILITY_SECS)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Failed to claim batch");
                sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                return;
            }
        };

        if batch.is_empty() {
            sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
            return;
        }

        for event in batch {
            self.handle_event(event).await;
        }
    }

    /// Processes one claimed event and settles its queue row.
    async fn handle_event(&self, event: queued_events::Model) {
        match traced::process_event(&self.processor, &event).await {
            Ok(processed) => {
                if let Err(e) = self.queue.mark_done(event).await {
                    // The transaction committed; the row will be
                    // redelivered and fail as a duplicate, then dead-letter.
                    error!(
                        event_id = %processed.event_id,
                        error = %e,
                        "Processed event could not be marked done"
                    );
                }
            }
            Err(engine_error) => {
                let message = engine_error.to_string();
                let settled = if engine_error.is_retryable() {
                    self.queue
                        .redeliver(
                            event,
                            self.config.retry_backoff_secs,
                            self.config.max_attempts,
                            &message,
                        )
                        .await
                } else {
                    self.queue
                        .dead_letter(event, &message)
                        .await
                        .map(|()| QueueDisposition::DeadLettered)
                };

                match settled {
                    Ok(QueueDisposition::Redelivered) => {
                        warn!(error = %message, "Event left for redelivery");
                    }
                    Ok(QueueDisposition::DeadLettered) => {
                        warn!(error = %message, "Event dead-lettered");
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to settle failed event");
                    }
                }
            }
        }
    }
}

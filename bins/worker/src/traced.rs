//! Per-event tracing instrumentation.
//!
//! Every processed event runs inside a span carrying the identifiers an
//! operator needs to correlate a failure: queue id, attempt, event type,
//! workflow id, and acting user. Outcome and elapsed time are logged on
//! completion.

use serde_json::Value;
use tracing::{Instrument, error, info, info_span};

use granary_core::workflow::EngineError;
use granary_db::entities::queued_events;
use granary_db::{EventProcessor, ProcessedEvent};

/// Extracts the log-context fields an envelope carries, tolerating
/// malformed payloads (those fail later with full diagnostics).
fn payload_context(payload: &Value) -> (Option<&str>, Option<&str>, Option<&str>) {
    let event_type = payload.get("event_type").and_then(Value::as_str);
    let acting_user = payload.get("acting_user_id").and_then(Value::as_str);
    let workflow_id = payload
        .pointer("/process_workflow_context/workflow_id")
        .and_then(Value::as_str);
    (event_type, acting_user, workflow_id)
}

/// Processes one event inside an instrumented span.
pub async fn process_event(
    processor: &EventProcessor,
    event: &queued_events::Model,
) -> Result<ProcessedEvent, EngineError> {
    let (event_type, acting_user, workflow_id) = payload_context(&event.payload);

    let span = info_span!(
        "event.process",
        queue_id = %event.id,
        attempt = event.attempts,
        event_type = event_type.unwrap_or("unknown"),
        acting_user = acting_user.unwrap_or("unknown"),
        workflow_id = workflow_id.unwrap_or("unknown"),
    );

    async {
        let start = std::time::Instant::now();
        let result = processor.process(&event.payload).await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(processed) => info!(
                workflow_id = %processed.workflow_id,
                transitions = processed.transitions,
                final_state = %processed.final_state,
                terminal = processed.terminal,
                elapsed_ms,
                "event processed"
            ),
            Err(e) => error!(
                error = %e,
                code = e.error_code(),
                retryable = e.is_retryable(),
                elapsed_ms,
                "event failed"
            ),
        }

        result
    }
    .instrument(span)
    .await
}

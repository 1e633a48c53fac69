//! Inbound event envelope.
//!
//! The envelope is the wire format of the externally queued events the
//! ingestion loop consumes. Deserialization accepts any structurally
//! well-formed JSON; [`EventEnvelope::action`] then enforces the schema
//! rule that exactly one context is present and matches the event type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use granary_shared::types::{EntityId, EventId, UserId, WorkflowId};

use crate::workflow::error::EngineError;

/// Kind of inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Create a new workflow instance.
    StartWorkflow,
    /// Drive an event through an existing workflow instance.
    ProcessWorkflow,
}

impl EventType {
    /// Returns the wire representation of the event type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StartWorkflow => "START_WORKFLOW",
            Self::ProcessWorkflow => "PROCESS_WORKFLOW",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a governed domain entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Wire-format entity kind name.
    pub entity_type: String,
    /// The entity's identifier.
    pub entity_id: EntityId,
}

/// Context for a start event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkflowContext {
    /// Wire-format workflow kind name.
    pub workflow_type: String,
    /// The entities the new workflow will govern.
    pub entities: Vec<EntityRef>,
}

/// Context for a process event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessWorkflowContext {
    /// The workflow instance to drive.
    pub workflow_id: WorkflowId,
    /// The machine event to send.
    pub event_to_send: String,
}

/// The validated inbound event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier of this event.
    pub event_id: EventId,
    /// The user the event acts on behalf of.
    pub acting_user_id: UserId,
    /// Kind of event.
    pub event_type: EventType,
    /// Present exactly when `event_type` is `START_WORKFLOW`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_workflow_context: Option<StartWorkflowContext>,
    /// Present exactly when `event_type` is `PROCESS_WORKFLOW`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_workflow_context: Option<ProcessWorkflowContext>,
    /// Free-form metadata map.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// The schema-checked action an envelope requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction<'a> {
    /// Create a workflow from the start context.
    Start(&'a StartWorkflowContext),
    /// Drive an existing workflow from the process context.
    Process(&'a ProcessWorkflowContext),
}

impl EventEnvelope {
    /// Deserializes an envelope from a raw queue payload.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`EngineError::MalformedEvent`] when the
    /// payload does not deserialize.
    pub fn from_payload(payload: &Value) -> Result<Self, EngineError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| EngineError::MalformedEvent(e.to_string()))
    }

    /// Validates the context-vs-type rule and returns the action.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`EngineError::MalformedEvent`] when the
    /// matching context is missing, the other context is present, or a
    /// start context names no entities.
    pub fn action(&self) -> Result<EventAction<'_>, EngineError> {
        match (
            self.event_type,
            &self.start_workflow_context,
            &self.process_workflow_context,
        ) {
            (EventType::StartWorkflow, Some(start), None) => {
                if start.entities.is_empty() {
                    return Err(EngineError::MalformedEvent(
                        "start_workflow_context names no entities".into(),
                    ));
                }
                Ok(EventAction::Start(start))
            }
            (EventType::ProcessWorkflow, None, Some(process)) => Ok(EventAction::Process(process)),
            (event_type, start, process) => Err(EngineError::MalformedEvent(format!(
                "event_type {event_type} with start_workflow_context {} and \
                 process_workflow_context {}",
                if start.is_some() { "present" } else { "absent" },
                if process.is_some() { "present" } else { "absent" },
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn start_payload() -> Value {
        json!({
            "event_id": "018f64ab-1111-7abc-9def-000000000001",
            "acting_user_id": "018f64ab-2222-7abc-9def-000000000002",
            "event_type": "START_WORKFLOW",
            "start_workflow_context": {
                "workflow_type": "opportunity_publish",
                "entities": [
                    {"entity_type": "opportunity", "entity_id": "018f64ab-3333-7abc-9def-000000000003"}
                ]
            }
        })
    }

    fn process_payload() -> Value {
        json!({
            "event_id": "018f64ab-1111-7abc-9def-000000000001",
            "acting_user_id": "018f64ab-2222-7abc-9def-000000000002",
            "event_type": "PROCESS_WORKFLOW",
            "process_workflow_context": {
                "workflow_id": "018f64ab-4444-7abc-9def-000000000004",
                "event_to_send": "approve"
            },
            "metadata": {"approval_response": "approve"}
        })
    }

    #[test]
    fn test_start_envelope_round_trip() {
        let envelope = EventEnvelope::from_payload(&start_payload()).unwrap();
        match envelope.action().unwrap() {
            EventAction::Start(start) => {
                assert_eq!(start.workflow_type, "opportunity_publish");
                assert_eq!(start.entities.len(), 1);
                assert_eq!(start.entities[0].entity_type, "opportunity");
            }
            EventAction::Process(_) => panic!("Expected start action"),
        }
    }

    #[test]
    fn test_process_envelope_round_trip() {
        let envelope = EventEnvelope::from_payload(&process_payload()).unwrap();
        match envelope.action().unwrap() {
            EventAction::Process(process) => {
                assert_eq!(process.event_to_send, "approve");
            }
            EventAction::Start(_) => panic!("Expected process action"),
        }
        assert_eq!(envelope.metadata["approval_response"], json!("approve"));
    }

    #[test]
    fn test_missing_context_is_malformed() {
        let mut payload = start_payload();
        payload
            .as_object_mut()
            .unwrap()
            .remove("start_workflow_context");
        let envelope = EventEnvelope::from_payload(&payload).unwrap();
        assert!(matches!(
            envelope.action(),
            Err(EngineError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_mismatched_context_is_malformed() {
        let mut payload = start_payload();
        payload.as_object_mut().unwrap().insert(
            "event_type".into(),
            json!("PROCESS_WORKFLOW"),
        );
        let envelope = EventEnvelope::from_payload(&payload).unwrap();
        assert!(matches!(
            envelope.action(),
            Err(EngineError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_both_contexts_is_malformed() {
        let mut payload = start_payload();
        payload.as_object_mut().unwrap().insert(
            "process_workflow_context".into(),
            json!({
                "workflow_id": "018f64ab-4444-7abc-9def-000000000004",
                "event_to_send": "approve"
            }),
        );
        let envelope = EventEnvelope::from_payload(&payload).unwrap();
        assert!(matches!(
            envelope.action(),
            Err(EngineError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_empty_entities_is_malformed() {
        let mut payload = start_payload();
        payload["start_workflow_context"]["entities"] = json!([]);
        let envelope = EventEnvelope::from_payload(&payload).unwrap();
        assert!(matches!(
            envelope.action(),
            Err(EngineError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_garbage_payload_is_malformed() {
        let result = EventEnvelope::from_payload(&json!({"event_type": "NOT_A_TYPE"}));
        assert!(matches!(result, Err(EngineError::MalformedEvent(_))));
    }

    #[test]
    fn test_metadata_defaults_to_empty() {
        let envelope = EventEnvelope::from_payload(&start_payload()).unwrap();
        assert!(envelope.metadata.is_empty());
    }
}

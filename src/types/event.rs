//! Operation events emitted by the controller during a query's lifecycle

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event_store::Keyed;

/// Operation event (OperationStarted, OperationCompleted, OperationFailed, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationEvent {
    /// ISO 8601 time the emitter created the event
    #[serde(default)]
    pub timestamp: String,
    /// Normal or Warning
    #[serde(default)]
    pub event_type: String,
    /// Short reason code
    #[serde(default)]
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    pub data: EventData,
}

/// Structured context attached to an operation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(default)]
    pub query_id: String,
    #[serde(default)]
    pub query_name: String,
    #[serde(default)]
    pub query_namespace: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Event-specific metadata kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Keyed for OperationEvent {
    fn key(&self) -> Option<&str> {
        if self.data.query_id.is_empty() {
            None
        } else {
            Some(&self.data.query_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let raw = json!({
            "timestamp": "2025-01-01T00:00:00Z",
            "eventType": "Normal",
            "reason": "OperationStarted",
            "message": "tool call",
            "data": {
                "queryId": "q1",
                "queryName": "weather",
                "queryNamespace": "default",
                "sessionId": "s1",
                "operation": "tool",
                "toolName": "get-weather"
            }
        });

        let event: OperationEvent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(event.key(), Some("q1"));
        assert_eq!(event.data.extra["toolName"], "get-weather");
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }

    #[test]
    fn test_missing_query_id_has_no_key() {
        let event: OperationEvent = serde_json::from_value(json!({"data": {}})).unwrap();
        assert_eq!(event.key(), None);
    }
}

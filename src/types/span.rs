//! OpenTelemetry span payloads as exported by the controller

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event_store::Keyed;

/// A finished span; everything beyond the identifiers is kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// kind, start/end times, attributes, status, resource
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Keyed for Span {
    fn key(&self) -> Option<&str> {
        Some(&self.trace_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exported_span_line() {
        let line = r#"{"traceId":"t1","spanId":"s1","name":"query","kind":1,"startTimeUnixNano":"1","endTimeUnixNano":"2","attributes":[{"key":"a","value":1}]}"#;
        let span: Span = serde_json::from_str(line).unwrap();

        assert_eq!(span.key(), Some("t1"));
        assert_eq!(span.span_id, "s1");
        assert_eq!(span.parent_span_id, None);
        assert_eq!(span.extra["kind"], 1);
        assert!(serde_json::to_string(&span).unwrap().contains("startTimeUnixNano"));
    }

    #[test]
    fn test_trace_id_is_required() {
        assert!(serde_json::from_str::<Span>(r#"{"spanId":"s1"}"#).is_err());
    }
}

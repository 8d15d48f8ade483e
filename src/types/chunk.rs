//! Streaming completion chunk payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event_store::Keyed;

/// Chunk body stored by the completion sentinel
pub const DONE_MARKER: &str = "[DONE]";

/// One chat-completion streaming chunk for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkData {
    pub query_id: String,
    pub chunk: Value,
    /// Set only on the sentinel that ends the query's chunk sequence
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub complete: bool,
}

impl ChunkData {
    pub fn new(query_id: impl Into<String>, chunk: Value) -> Self {
        Self {
            query_id: query_id.into(),
            chunk,
            complete: false,
        }
    }

    /// The end-of-stream sentinel for `query_id`
    pub fn done(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            chunk: Value::String(DONE_MARKER.to_string()),
            complete: true,
        }
    }
}

impl Keyed for ChunkData {
    fn key(&self) -> Option<&str> {
        Some(&self.query_id)
    }

    fn is_terminal(&self) -> bool {
        self.complete
    }
}

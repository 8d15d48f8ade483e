//! Conversation message payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Item;
use crate::event_store::Keyed;
use crate::utils::to_iso;

/// One OpenAI-format message stored for a conversation/query pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub conversation_id: String,
    pub query_id: String,
    /// Opaque message body (role, content, tool calls, ...)
    pub message: Value,
}

impl Keyed for MessageData {
    fn key(&self) -> Option<&str> {
        Some(&self.conversation_id)
    }
}

/// HTTP projection of a stored message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub timestamp: String,
    pub conversation_id: String,
    pub query_id: String,
    pub message: Value,
    pub sequence: u64,
}

impl From<&Item<MessageData>> for MessageRecord {
    fn from(item: &Item<MessageData>) -> Self {
        Self {
            timestamp: to_iso(&item.timestamp),
            conversation_id: item.data.conversation_id.clone(),
            query_id: item.data.query_id.clone(),
            message: item.data.message.clone(),
            sequence: item.sequence_number,
        }
    }
}

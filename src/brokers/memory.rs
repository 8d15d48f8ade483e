//! Memory broker - conversation messages grouped by conversation and query

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::event_store::{KeyedLog, LogConfig, Scope, Subscription};
use crate::types::{Item, MessageData, Page, PageParams};

/// Optional filters for [`MemoryBroker::paginate`]; empty strings are ignored
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub conversation_id: Option<String>,
    pub query_id: Option<String>,
}

impl MessageFilter {
    fn matches(&self, data: &MessageData) -> bool {
        let conv_ok = match self.conversation_id.as_deref() {
            Some(id) if !id.is_empty() => data.conversation_id == id,
            _ => true,
        };
        let query_ok = match self.query_id.as_deref() {
            Some(id) if !id.is_empty() => data.query_id == id,
            _ => true,
        };
        conv_ok && query_ok
    }
}

/// Per-conversation counters reported by `/memory-status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationStats {
    pub message_count: usize,
    pub query_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryStatus {
    pub total_conversations: usize,
    pub total_messages: usize,
    pub conversations: BTreeMap<String, ConversationStats>,
}

/// Stores chat messages; keyed by conversation
pub struct MemoryBroker {
    log: KeyedLog<MessageData>,
}

impl MemoryBroker {
    pub const NAME: &'static str = "Memory";

    pub fn new(config: LogConfig) -> Self {
        Self {
            log: KeyedLog::open(config),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            log: KeyedLog::in_memory(Self::NAME),
        }
    }

    /// The underlying log, for live tails
    pub fn log(&self) -> &KeyedLog<MessageData> {
        &self.log
    }

    pub fn add_message(
        &self,
        conversation_id: &str,
        query_id: &str,
        message: Value,
    ) -> Item<MessageData> {
        self.log.append(MessageData {
            conversation_id: conversation_id.to_string(),
            query_id: query_id.to_string(),
            message,
        })
    }

    pub fn add_messages(
        &self,
        conversation_id: &str,
        query_id: &str,
        messages: Vec<Value>,
    ) -> Vec<Item<MessageData>> {
        self.log.append_all(messages.into_iter().map(|message| MessageData {
            conversation_id: conversation_id.to_string(),
            query_id: query_id.to_string(),
            message,
        }))
    }

    pub fn get_by_conversation(&self, conversation_id: &str) -> Vec<Item<MessageData>> {
        self.log.by_key(conversation_id)
    }

    pub fn get_by_query(&self, query_id: &str) -> Vec<Item<MessageData>> {
        self.log.filter(|item| item.data.query_id == query_id)
    }

    /// Unique conversation IDs in first-seen order
    pub fn conversation_ids(&self) -> Vec<String> {
        self.log.keys()
    }

    pub fn all(&self) -> Vec<Item<MessageData>> {
        self.log.all()
    }

    pub fn save(&self) {
        self.log.save();
    }

    /// Remove every message and restart numbering
    pub fn delete(&self) -> usize {
        self.log.clear()
    }

    pub fn delete_conversation(&self, conversation_id: &str) -> usize {
        self.log
            .delete_where(|item| item.data.conversation_id == conversation_id)
    }

    pub fn delete_query(&self, conversation_id: &str, query_id: &str) -> usize {
        self.log.delete_where(|item| {
            item.data.conversation_id == conversation_id && item.data.query_id == query_id
        })
    }

    pub fn subscribe(
        &self,
        callback: impl Fn(&Item<MessageData>) + Send + Sync + 'static,
    ) -> Subscription<MessageData> {
        self.log.subscribe(Scope::All, callback)
    }

    pub fn subscribe_to_conversation(
        &self,
        conversation_id: &str,
        callback: impl Fn(&Item<MessageData>) + Send + Sync + 'static,
    ) -> Subscription<MessageData> {
        self.log.subscribe(Scope::key(conversation_id), callback)
    }

    pub fn paginate(&self, params: PageParams, filter: &MessageFilter) -> Page<Item<MessageData>> {
        self.log
            .paginate_filtered(params, |item| filter.matches(&item.data))
    }

    pub fn current_sequence(&self) -> u64 {
        self.log.current_sequence()
    }

    /// Message and query counts per conversation
    pub fn status(&self) -> MemoryStatus {
        let items = self.log.all();

        let mut conversations: BTreeMap<String, (usize, HashSet<&str>)> = BTreeMap::new();
        for item in &items {
            let entry = conversations
                .entry(item.data.conversation_id.clone())
                .or_default();
            entry.0 += 1;
            entry.1.insert(&item.data.query_id);
        }

        MemoryStatus {
            total_conversations: conversations.len(),
            total_messages: items.len(),
            conversations: conversations
                .into_iter()
                .map(|(id, (message_count, queries))| {
                    (
                        id,
                        ConversationStats {
                            message_count,
                            query_count: queries.len(),
                        },
                    )
                })
                .collect(),
        }
    }
}

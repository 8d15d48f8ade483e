//! Completion chunk broker - streaming chat-completion chunks per query
//!
//! A query's chunk sequence ends with a `[DONE]` sentinel appended by
//! [`CompletionChunkBroker::complete_query`]. Completion is tracked in the
//! log's per-key status, so `is_complete` and `has_query` are lookups.

use serde_json::Value;

use crate::event_store::{KeyedLog, LogConfig, Scope, Subscription};
use crate::types::{ChunkData, Item, Page, PageParams};

pub struct CompletionChunkBroker {
    log: KeyedLog<ChunkData>,
}

impl CompletionChunkBroker {
    pub const NAME: &'static str = "CompletionChunk";

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

    pub fn log(&self) -> &KeyedLog<ChunkData> {
        &self.log
    }

    pub fn add_chunk(&self, query_id: &str, chunk: Value) -> Item<ChunkData> {
        self.log.append(ChunkData::new(query_id, chunk))
    }

    /// Append the `[DONE]` sentinel for `query_id` and persist
    pub fn complete_query(&self, query_id: &str) -> Item<ChunkData> {
        let item = self.log.append(ChunkData::done(query_id));
        self.log.save();
        item
    }

    /// Every item for the query, sentinel included
    pub fn get_by_query(&self, query_id: &str) -> Vec<Item<ChunkData>> {
        self.log.by_key(query_id)
    }

    /// Raw chunk values for the query, sentinel included
    pub fn get_chunks_by_query(&self, query_id: &str) -> Vec<Value> {
        self.get_by_query(query_id)
            .into_iter()
            .map(|item| item.data.chunk)
            .collect()
    }

    pub fn is_complete(&self, query_id: &str) -> bool {
        self.log
            .key_status(query_id)
            .is_some_and(|status| status.is_complete())
    }

    pub fn has_query(&self, query_id: &str) -> bool {
        self.log.has_key(query_id)
    }

    pub fn all(&self) -> Vec<Item<ChunkData>> {
        self.log.all()
    }

    pub fn save(&self) {
        self.log.save();
    }

    pub fn delete(&self) -> usize {
        self.log.clear()
    }

    pub fn delete_query(&self, query_id: &str) -> usize {
        self.log.delete_where(|item| item.data.query_id == query_id)
    }

    pub fn subscribe(
        &self,
        callback: impl Fn(&Item<ChunkData>) + Send + Sync + 'static,
    ) -> Subscription<ChunkData> {
        self.log.subscribe(Scope::All, callback)
    }

    pub fn subscribe_to_query(
        &self,
        query_id: &str,
        callback: impl Fn(&Item<ChunkData>) + Send + Sync + 'static,
    ) -> Subscription<ChunkData> {
        self.log.subscribe(Scope::key(query_id), callback)
    }

    pub fn paginate(&self, params: PageParams, query_id: Option<&str>) -> Page<Item<ChunkData>> {
        match query_id.filter(|id| !id.is_empty()) {
            Some(id) => self
                .log
                .paginate_filtered(params, |item| item.data.query_id == id),
            None => self.log.paginate(params),
        }
    }

    pub fn current_sequence(&self) -> u64 {
        self.log.current_sequence()
    }
}

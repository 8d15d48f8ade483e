//! Event broker - operation events keyed by query, bounded in memory

use crate::event_store::{KeyedLog, LogConfig, Scope, Subscription};
use crate::types::{Item, OperationEvent, Page, PageParams};

/// Default in-memory bound on stored events
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Operation events; the oldest are dropped once capacity is reached.
///
/// Appends are not persisted individually. The stream is written on
/// `purge()` and at shutdown.
pub struct EventBroker {
    log: KeyedLog<OperationEvent>,
}

impl EventBroker {
    pub const NAME: &'static str = "Event";

    /// Open with `config`, applying [`DEFAULT_EVENT_CAPACITY`] when none is set
    pub fn new(mut config: LogConfig) -> Self {
        if config.capacity.is_none() {
            config.capacity = Some(DEFAULT_EVENT_CAPACITY);
        }
        Self {
            log: KeyedLog::open(config),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(LogConfig::new(Self::NAME))
    }

    pub fn log(&self) -> &KeyedLog<OperationEvent> {
        &self.log
    }

    pub fn add_event(&self, event: OperationEvent) -> Item<OperationEvent> {
        self.log.append(event)
    }

    pub fn get_events(&self) -> Vec<Item<OperationEvent>> {
        self.log.all()
    }

    pub fn get_events_by_query(&self, query_id: &str) -> Vec<Item<OperationEvent>> {
        self.log.by_key(query_id)
    }

    pub fn subscribe_to_query(
        &self,
        query_id: &str,
        callback: impl Fn(&Item<OperationEvent>) + Send + Sync + 'static,
    ) -> Subscription<OperationEvent> {
        self.log.subscribe(Scope::key(query_id), callback)
    }

    pub fn subscribe_to_all(
        &self,
        callback: impl Fn(&Item<OperationEvent>) + Send + Sync + 'static,
    ) -> Subscription<OperationEvent> {
        self.log.subscribe(Scope::All, callback)
    }

    /// Drop every event and persist the empty stream
    pub fn purge(&self) -> usize {
        let removed = self.log.clear();
        tracing::info!(stream = Self::NAME, removed, "cleared all events");
        removed
    }

    pub fn save(&self) {
        self.log.save();
    }

    pub fn paginate(&self, params: PageParams, query_id: Option<&str>) -> Page<Item<OperationEvent>> {
        match query_id.filter(|id| !id.is_empty()) {
            Some(id) => self
                .log
                .paginate_filtered(params, |item| item.data.data.query_id == id),
            None => self.log.paginate(params),
        }
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

//! Trace broker - OTEL spans keyed by trace ID

use crate::event_store::{KeyedLog, LogConfig, Scope, Subscription};
use crate::types::{Item, Page, PageParams, Span};

pub struct TraceBroker {
    log: KeyedLog<Span>,
}

impl TraceBroker {
    pub const NAME: &'static str = "Trace";

    pub fn new(config: LogConfig) -> Self {
        Self {
            log: KeyedLog::open(config),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(LogConfig::new(Self::NAME))
    }

    pub fn log(&self) -> &KeyedLog<Span> {
        &self.log
    }

    pub fn add_span(&self, span: Span) -> Item<Span> {
        self.log.append(span)
    }

    pub fn add_spans(&self, spans: Vec<Span>) -> Vec<Item<Span>> {
        self.log.append_all(spans)
    }

    /// Spans of one trace, in arrival order
    pub fn spans(&self, trace_id: &str) -> Vec<Span> {
        self.log
            .by_key(trace_id)
            .into_iter()
            .map(|item| item.data)
            .collect()
    }

    pub fn all_spans(&self) -> Vec<Span> {
        self.log.all().into_iter().map(|item| item.data).collect()
    }

    /// Distinct trace IDs in first-seen order
    pub fn trace_ids(&self) -> Vec<String> {
        self.log.keys()
    }

    pub fn has_trace(&self, trace_id: &str) -> bool {
        self.log.has_key(trace_id)
    }

    pub fn subscribe_to_trace(
        &self,
        trace_id: &str,
        callback: impl Fn(&Item<Span>) + Send + Sync + 'static,
    ) -> Subscription<Span> {
        self.log.subscribe(Scope::key(trace_id), callback)
    }

    pub fn subscribe_to_all(
        &self,
        callback: impl Fn(&Item<Span>) + Send + Sync + 'static,
    ) -> Subscription<Span> {
        self.log.subscribe(Scope::All, callback)
    }

    pub fn purge(&self) -> usize {
        let removed = self.log.clear();
        tracing::info!(stream = Self::NAME, removed, "cleared all spans");
        removed
    }

    pub fn save(&self) {
        self.log.save();
    }

    pub fn paginate(&self, params: PageParams, trace_id: Option<&str>) -> Page<Item<Span>> {
        match trace_id.filter(|id| !id.is_empty()) {
            Some(id) => self
                .log
                .paginate_filtered(params, |item| item.data.trace_id == id),
            None => self.log.paginate(params),
        }
    }

    pub fn span_count(&self) -> usize {
        self.log.len()
    }

    pub fn trace_count(&self) -> usize {
        self.log.key_count()
    }
}

//! Shared application context handed to every handler

use std::time::Duration;

use tracing::info;

use crate::brokers::{CompletionChunkBroker, EventBroker, MemoryBroker, TraceBroker};
use crate::config::{BrokerConfig, DEFAULT_HEARTBEAT};

/// The four brokers plus transport settings, built once at startup
pub struct AppContext {
    pub memory: MemoryBroker,
    pub chunks: CompletionChunkBroker,
    pub events: EventBroker,
    pub traces: TraceBroker,
    /// Interval between SSE heartbeat comments
    pub heartbeat: Duration,
}

impl AppContext {
    /// Open every broker described by `config`, loading persisted state
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            memory: MemoryBroker::new(config.memory.clone()),
            chunks: CompletionChunkBroker::new(config.chunks.clone()),
            events: EventBroker::new(config.events.clone()),
            traces: TraceBroker::new(config.traces.clone()),
            heartbeat: config.heartbeat,
        }
    }

    /// Context with no persistence
    pub fn in_memory() -> Self {
        Self {
            memory: MemoryBroker::in_memory(),
            chunks: CompletionChunkBroker::in_memory(),
            events: EventBroker::in_memory(),
            traces: TraceBroker::in_memory(),
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Flush every broker to disk
    pub fn save_all(&self) {
        self.memory.save();
        self.chunks.save();
        self.events.save();
        self.traces.save();
        info!("saved all brokers");
    }
}

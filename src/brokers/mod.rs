//! Typed brokers
//!
//! Each broker wraps one [`KeyedLog`](crate::event_store::KeyedLog) and adds
//! the queries its payload needs:
//! - `MemoryBroker`: conversation messages, keyed by conversation
//! - `CompletionChunkBroker`: streaming chunks, keyed by query
//! - `EventBroker`: operation events, keyed by query, bounded in memory
//! - `TraceBroker`: OTEL spans, keyed by trace

mod chunks;
mod events;
mod memory;
mod traces;

pub use chunks::CompletionChunkBroker;
pub use events::{EventBroker, DEFAULT_EVENT_CAPACITY};
pub use memory::{ConversationStats, MemoryBroker, MemoryStatus, MessageFilter};
pub use traces::TraceBroker;

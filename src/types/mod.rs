//! Data types for the broker
//!
//! The generic item and page envelopes, plus the payload shapes stored by
//! each typed broker.

mod chunk;
mod event;
mod item;
mod message;
mod page;
mod span;

pub use chunk::{ChunkData, DONE_MARKER};
pub use event::{EventData, OperationEvent};
pub use item::Item;
pub use message::{MessageData, MessageRecord};
pub use page::{parse_cursor, Page, PageParams, PaginationError, DEFAULT_LIMIT, MAX_LIMIT};
pub use span::Span;

//! Event Store Module
//!
//! The append-only log shared by every broker:
//! - `KeyedLog`: sequencing, filtered reads, pagination, subscriber fan-out
//! - `SnapshotStore` / `JsonFileStore`: bounded JSON file persistence
//! - `Subscription`: handle that unsubscribes on drop
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌──────────┐    ┌──────────────┐    ┌───────────────┐    ┌─────────────┐
//! │ Producer │───►│ append()     │───►│ notify key +  │───►│ save()      │
//! │ (HTTP)   │    │ seq, time    │    │ "all" subs    │    │ JSON file   │
//! └──────────┘    └──────────────┘    └───────────────┘    └─────────────┘
//!
//! Read Path (Startup):
//! ┌───────────────┐    ┌─────────────────┐
//! │ Load snapshot │───►│ Rebuild key     │───► Ready!
//! │ (items+next)  │    │ status index    │
//! └───────────────┘    └─────────────────┘
//! ```

mod keyed;
mod migration;
mod snapshot;
mod store;
mod subscribers;

pub use keyed::Keyed;
pub use snapshot::{CorruptState, JsonFileStore, Snapshot, SnapshotStore, StoreError};
pub use store::{KeyStatus, KeyedLog, LogConfig, Replay};
pub use subscribers::{Callback, Scope, Subscription};

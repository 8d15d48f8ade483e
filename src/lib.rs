//! ARK Broker
//!
//! Append-only broker service for agent queries: conversation memory,
//! streaming completion chunks, operation events and OTEL traces, each kept
//! in a sequenced log with cursor pagination, bounded JSON persistence and
//! Server-Sent Events live tails.
//!
//! # Modules
//!
//! - `types`: Items, pages and the payload shapes of each broker
//! - `event_store`: The generic keyed log, subscriptions and file snapshots
//! - `brokers`: Typed brokers over the log
//! - `api`: Axum router, REST handlers and the SSE live tail
//! - `config`: Environment configuration
//! - `utils`: Timestamp helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ark_broker::{create_router, AppContext, BrokerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BrokerConfig::from_env()?;
//!     let ctx = Arc::new(AppContext::from_config(&config));
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//!     axum::serve(listener, create_router(ctx)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod brokers;
pub mod config;
pub mod event_store;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use api::{create_router, AppContext};
pub use brokers::{CompletionChunkBroker, EventBroker, MemoryBroker, TraceBroker};
pub use config::{BrokerConfig, ConfigError};
pub use event_store::{KeyedLog, LogConfig, Replay, Scope, Subscription};
pub use types::{Item, Page, PageParams, PaginationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

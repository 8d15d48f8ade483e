//! API module for HTTP and SSE endpoints
//!
//! This module exposes the brokers over REST and streams live items to
//! watchers with Server-Sent Events.

pub mod http;
pub mod ndjson;
pub mod rest;
pub mod sse;
pub mod state;

pub use http::create_router;
pub use state::AppContext;

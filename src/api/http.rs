//! HTTP server setup with Axum

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::rest::{events, memory, stream, traces};
use super::state::AppContext;

/// Largest JSON request body accepted
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Create the Axum router with all endpoints
pub fn create_router(ctx: Arc<AppContext>) -> Router {
    // Producers and dashboards run on other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Conversation memory
        .route(
            "/messages",
            get(memory::list_messages)
                .post(memory::add_messages)
                .delete(memory::purge_messages),
        )
        .route("/memory-status", get(memory::memory_status))
        .route(
            "/conversations",
            get(memory::list_conversations)
                .post(memory::create_conversation)
                .delete(memory::delete_all_conversations),
        )
        .route(
            "/conversations/:conversation_id",
            get(memory::get_conversation).delete(memory::delete_conversation),
        )
        .route(
            "/conversations/:conversation_id/queries/:query_id/messages",
            delete(memory::delete_query_messages),
        )
        // Completion chunks
        .route(
            "/stream",
            get(stream::list_chunks).delete(stream::purge_chunks),
        )
        .route(
            "/stream/:query_id",
            get(stream::get_query_chunks)
                .post(stream::add_chunks)
                .delete(stream::delete_query_chunks),
        )
        .route("/stream/:query_id/complete", post(stream::complete_query))
        // Operation events
        .route(
            "/events",
            get(events::list_events)
                .post(events::add_event)
                .delete(events::purge_events),
        )
        .route("/events/:query_id", get(events::get_query_events))
        // Traces
        .route(
            "/traces",
            get(traces::list_traces)
                .post(traces::ingest_spans)
                .delete(traces::purge_traces),
        )
        .route("/traces/batch", post(traces::ingest_batch))
        .route("/traces/:trace_id", get(traces::get_trace))
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .with_state(ctx)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Access log line per request
async fn log_request(request: Request, next: Next) -> Response {
    info!(method = %request.method(), path = %request.uri().path(), "request");
    next.run(request).await
}

//! Completion chunk endpoints

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{ApiError, ApiResult, StatusMessage, StreamQuery};
use crate::api::ndjson;
use crate::api::sse::live_tail;
use crate::api::state::AppContext;
use crate::event_store::Scope;

/// Largest single-document chunk upload accepted
const MAX_JSON_BODY: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct QueryChunks {
    pub query_id: String,
    pub complete: bool,
    pub chunks: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChunksReceived {
    pub status: &'static str,
    pub chunks_received: usize,
}

/// GET /stream - Paginated chunks across queries, or a live tail
pub async fn list_chunks(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    if query.watching() {
        let replay = query.replay()?;
        let scope = match query.query_id() {
            Some(id) => Scope::key(id),
            None => Scope::All,
        };
        return Ok(live_tail(
            "STREAM",
            ctx.chunks.log(),
            scope,
            replay,
            ctx.heartbeat,
            |item| item.data.clone(),
        ));
    }

    let params = query.page_params()?;
    Ok(Json(ctx.chunks.paginate(params, query.query_id())).into_response())
}

/// GET /stream/:query_id - Chunks of one query, or a live tail of its chunk values
pub async fn get_query_chunks(
    State(ctx): State<Arc<AppContext>>,
    Path(query_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    if query.watching() {
        let replay = query.replay()?;
        return Ok(live_tail(
            "STREAM",
            ctx.chunks.log(),
            Scope::key(query_id),
            replay,
            ctx.heartbeat,
            |item| item.data.chunk.clone(),
        ));
    }

    if !ctx.chunks.has_query(&query_id) {
        return Err(ApiError::not_found("Query not found"));
    }

    Ok(Json(QueryChunks {
        complete: ctx.chunks.is_complete(&query_id),
        chunks: ctx.chunks.get_chunks_by_query(&query_id),
        query_id,
    })
    .into_response())
}

/// POST /stream/:query_id - Append chunks.
///
/// An `application/json` body is one chunk. Anything else is read as NDJSON,
/// one chunk per line, appended as each line arrives.
pub async fn add_chunks(
    State(ctx): State<Arc<AppContext>>,
    Path(query_id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<Json<ChunksReceived>> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let received = if is_json {
        let bytes = to_bytes(body, MAX_JSON_BODY)
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read body: {}", e)))?;
        let chunk: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?;
        ctx.chunks.add_chunk(&query_id, chunk);
        1
    } else {
        let mut received = 0;
        ndjson::for_each_line(body, |line| match serde_json::from_str::<Value>(line) {
            Ok(chunk) => {
                ctx.chunks.add_chunk(&query_id, chunk);
                received += 1;
            }
            Err(e) => warn!(query_id = %query_id, error = %e, "failed to parse chunk, skipping"),
        })
        .await
        .map_err(|e| {
            warn!(query_id = %query_id, error = %e, "chunk upload interrupted");
            ApiError::internal("Stream processing failed")
        })?;
        received
    };

    ctx.chunks.save();
    info!(query_id = %query_id, chunks = received, "received chunks");

    Ok(Json(ChunksReceived {
        status: "chunks_processed",
        chunks_received: received,
    }))
}

/// POST /stream/:query_id/complete - Mark the query's chunk sequence finished
pub async fn complete_query(
    State(ctx): State<Arc<AppContext>>,
    Path(query_id): Path<String>,
) -> Json<StatusMessage> {
    ctx.chunks.complete_query(&query_id);
    info!(query_id = %query_id, "query completed");
    StatusMessage::success(format!("Query {} completed", query_id))
}

/// DELETE /stream/:query_id
pub async fn delete_query_chunks(
    State(ctx): State<Arc<AppContext>>,
    Path(query_id): Path<String>,
) -> Json<StatusMessage> {
    ctx.chunks.delete_query(&query_id);
    StatusMessage::success(format!("Query {} chunks deleted", query_id))
}

/// DELETE /stream - Purge all chunks
pub async fn purge_chunks(State(ctx): State<Arc<AppContext>>) -> Json<StatusMessage> {
    ctx.chunks.delete();
    StatusMessage::success("Stream data purged")
}

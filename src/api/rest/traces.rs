//! Trace endpoints

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::{ApiError, ApiResult, StatusMessage, StreamQuery};
use crate::api::ndjson;
use crate::api::sse::live_tail;
use crate::api::state::AppContext;
use crate::event_store::Scope;
use crate::types::Span;

#[derive(Debug, Serialize)]
pub struct TraceSummary {
    pub total_traces: usize,
    pub total_spans: usize,
    pub trace_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TraceDetail {
    pub trace_id: String,
    pub span_count: usize,
    pub spans: Vec<Span>,
}

#[derive(Debug, Serialize)]
pub struct SpansReceived {
    pub status: &'static str,
    pub spans_received: usize,
}

/// Request body for POST /traces/batch
#[derive(Debug, Deserialize)]
pub struct SpanBatch {
    pub spans: Option<Value>,
}

/// GET /traces - Trace overview, or a live tail of every span
pub async fn list_traces(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    if query.watching() {
        let replay = query.replay()?;
        return Ok(live_tail(
            "TRACES",
            ctx.traces.log(),
            Scope::All,
            replay,
            ctx.heartbeat,
            |item| item.data.clone(),
        ));
    }

    Ok(Json(TraceSummary {
        total_traces: ctx.traces.trace_count(),
        total_spans: ctx.traces.span_count(),
        trace_ids: ctx.traces.trace_ids(),
    })
    .into_response())
}

/// GET /traces/:trace_id - Spans of one trace, or a live tail
pub async fn get_trace(
    State(ctx): State<Arc<AppContext>>,
    Path(trace_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    if query.watching() {
        let replay = query.replay()?;
        return Ok(live_tail(
            "TRACES",
            ctx.traces.log(),
            Scope::key(trace_id),
            replay,
            ctx.heartbeat,
            |item| item.data.clone(),
        ));
    }

    if !ctx.traces.has_trace(&trace_id) {
        return Err(ApiError::not_found("Trace not found"));
    }

    let spans = ctx.traces.spans(&trace_id);
    Ok(Json(TraceDetail {
        trace_id,
        span_count: spans.len(),
        spans,
    })
    .into_response())
}

/// POST /traces - Ingest NDJSON spans as they stream in; bad lines are skipped
pub async fn ingest_spans(
    State(ctx): State<Arc<AppContext>>,
    body: Body,
) -> ApiResult<Json<SpansReceived>> {
    let mut received = 0;

    ndjson::for_each_line(body, |line| match serde_json::from_str::<Span>(line) {
        Ok(span) => {
            if received == 0 {
                info!("receiving spans");
            }
            ctx.traces.add_span(span);
            received += 1;
        }
        Err(e) => warn!(error = %e, "failed to parse span, skipping"),
    })
    .await
    .map_err(|e| {
        warn!(error = %e, received, "span upload interrupted");
        ApiError::internal("Stream processing failed")
    })?;

    info!(spans = received, "received spans");
    Ok(Json(SpansReceived {
        status: "spans_processed",
        spans_received: received,
    }))
}

/// POST /traces/batch - Ingest `{"spans": [...]}`
pub async fn ingest_batch(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<SpanBatch>,
) -> ApiResult<Json<SpansReceived>> {
    let Some(raw @ Value::Array(_)) = body.spans else {
        return Err(ApiError::bad_request(
            "Request body must contain a spans array",
        ));
    };
    let spans: Vec<Span> = serde_json::from_value(raw)
        .map_err(|e| ApiError::bad_request(format!("Invalid span: {}", e)))?;

    info!(spans = spans.len(), "received span batch");
    let received = ctx.traces.add_spans(spans).len();

    Ok(Json(SpansReceived {
        status: "spans_processed",
        spans_received: received,
    }))
}

/// DELETE /traces - Purge all spans
pub async fn purge_traces(State(ctx): State<Arc<AppContext>>) -> Json<StatusMessage> {
    ctx.traces.purge();
    StatusMessage::success("Trace data purged")
}

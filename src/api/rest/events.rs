//! Operation event endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::{ApiError, ApiResult, StatusMessage, StreamQuery};
use crate::api::sse::live_tail;
use crate::api::state::AppContext;
use crate::event_store::Scope;
use crate::types::OperationEvent;

#[derive(Debug, Serialize)]
pub struct EventList {
    pub total_events: usize,
    pub events: Vec<OperationEvent>,
}

#[derive(Debug, Serialize)]
pub struct QueryEvents {
    pub query_id: String,
    pub event_count: usize,
    pub events: Vec<OperationEvent>,
}

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub status: &'static str,
}

/// GET /events - Every stored event, or a live tail of all events
pub async fn list_events(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    if query.watching() {
        let replay = query.replay()?;
        return Ok(live_tail(
            "EVENTS",
            ctx.events.log(),
            Scope::All,
            replay,
            ctx.heartbeat,
            |item| item.data.clone(),
        ));
    }

    let events: Vec<OperationEvent> = ctx
        .events
        .get_events()
        .into_iter()
        .map(|item| item.data)
        .collect();

    Ok(Json(EventList {
        total_events: events.len(),
        events,
    })
    .into_response())
}

/// GET /events/:query_id - Events of one query, or a live tail
pub async fn get_query_events(
    State(ctx): State<Arc<AppContext>>,
    Path(query_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    if query.watching() {
        let replay = query.replay()?;
        return Ok(live_tail(
            "EVENTS",
            ctx.events.log(),
            Scope::key(query_id),
            replay,
            ctx.heartbeat,
            |item| item.data.clone(),
        ));
    }

    let events: Vec<OperationEvent> = ctx
        .events
        .get_events_by_query(&query_id)
        .into_iter()
        .map(|item| item.data)
        .collect();

    Ok(Json(QueryEvents {
        query_id,
        event_count: events.len(),
        events,
    })
    .into_response())
}

/// POST /events - Record one operation event
pub async fn add_event(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Accepted>)> {
    let has_query_id = body
        .pointer("/data/queryId")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    if !has_query_id {
        return Err(ApiError::bad_request("Invalid event"));
    }

    let event: OperationEvent =
        serde_json::from_value(body).map_err(|_| ApiError::bad_request("Invalid event"))?;
    ctx.events.add_event(event);

    Ok((StatusCode::CREATED, Json(Accepted { status: "success" })))
}

/// DELETE /events - Purge all events
pub async fn purge_events(State(ctx): State<Arc<AppContext>>) -> Json<StatusMessage> {
    ctx.events.purge();
    StatusMessage::success("Event data purged")
}

//! HTTP API tests
//!
//! Drives the router with `oneshot` requests:
//! - Memory, stream, event and trace endpoints
//! - Pagination parameter validation
//! - SSE live tails (replay, live frames, heartbeats, disconnect)

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body, BodyDataStream};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use ark_broker::{create_router, AppContext};

fn setup() -> (Arc<AppContext>, Router) {
    let ctx = Arc::new(AppContext::in_memory());
    let app = create_router(Arc::clone(&ctx));
    (ctx, app)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn next_frame(stream: &mut BodyDataStream) -> String {
    let frame = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for SSE frame")
        .expect("stream ended")
        .unwrap();
    String::from_utf8(frame.to_vec()).unwrap()
}

fn sample_event(query_id: &str, reason: &str) -> Value {
    json!({
        "timestamp": "2025-01-01T00:00:00Z",
        "eventType": "Normal",
        "reason": reason,
        "message": "operation",
        "data": {
            "queryId": query_id,
            "queryName": "weather",
            "queryNamespace": "default",
            "sessionId": "s1"
        }
    })
}

// ============================================================================
// Memory
// ============================================================================

#[tokio::test]
async fn test_post_and_paginate_messages() {
    let (ctx, app) = setup();

    let response = send(
        &app,
        Method::POST,
        "/messages",
        Some(json!({
            "conversation_id": "conv1",
            "query_id": "q1",
            "messages": [{"role": "user", "content": "a"}, {"role": "assistant", "content": "b"}, {"role": "user", "content": "c"}]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.memory.current_sequence(), 3);

    let page = json_body(send(&app, Method::GET, "/messages?limit=2", None).await).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["hasMore"], true);
    assert_eq!(page["nextCursor"], 2);
    assert_eq!(page["items"][0]["conversation_id"], "conv1");
    assert_eq!(page["items"][0]["sequence"], 1);
    assert_eq!(page["items"][1]["message"]["content"], "b");

    let page = json_body(send(&app, Method::GET, "/messages?limit=2&cursor=2", None).await).await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["hasMore"], false);
    assert!(page.get("nextCursor").is_none());
}

#[tokio::test]
async fn test_invalid_pagination_is_bad_request() {
    let (_ctx, app) = setup();

    for (uri, message) in [
        ("/messages?limit=0", "limit must be a positive integer"),
        ("/messages?limit=abc", "limit must be a positive integer"),
        ("/messages?limit=1001", "limit cannot exceed 1000"),
        ("/messages?cursor=-5", "cursor must be a non-negative integer"),
        ("/stream?limit=5000", "limit cannot exceed 1000"),
    ] {
        let response = send(&app, Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body = json_body(response).await;
        assert_eq!(body["error"], message);
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_post_messages_requires_fields() {
    let (_ctx, app) = setup();

    let response = send(
        &app,
        Method::POST,
        "/messages",
        Some(json!({"query_id": "q1", "messages": []})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "conversation_id is required");

    let response = send(
        &app,
        Method::POST,
        "/messages",
        Some(json!({"conversation_id": "c", "query_id": "q1", "messages": "nope"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "messages array is required");
}

#[tokio::test]
async fn test_conversation_endpoints() {
    let (ctx, app) = setup();

    let response = send(&app, Method::POST, "/conversations", None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let conversation_id = created["conversation_id"].as_str().unwrap().to_string();
    assert_eq!(conversation_id.len(), 36);

    let response = send(&app, Method::GET, &format!("/conversations/{}", conversation_id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    ctx.memory.add_message(&conversation_id, "q1", json!({"content": "hi"}));
    ctx.memory.add_message(&conversation_id, "q2", json!({"content": "again"}));
    ctx.memory.add_message("other", "q3", json!({"content": "x"}));

    let detail = json_body(send(&app, Method::GET, &format!("/conversations/{}", conversation_id), None).await).await;
    assert_eq!(detail["messages"].as_array().unwrap().len(), 2);

    let list = json_body(send(&app, Method::GET, "/conversations", None).await).await;
    assert_eq!(list["conversations"], json!([conversation_id.clone(), "other"]));

    let status = json_body(send(&app, Method::GET, "/memory-status", None).await).await;
    assert_eq!(status["total_conversations"], 2);
    assert_eq!(status["total_messages"], 3);
    assert_eq!(status["conversations"][&conversation_id]["query_count"], 2);

    let uri = format!("/conversations/{}/queries/q1/messages", conversation_id);
    let response = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.memory.get_by_conversation(&conversation_id).len(), 1);

    send(&app, Method::DELETE, "/conversations/other", None).await;
    assert_eq!(ctx.memory.conversation_ids(), vec![conversation_id]);

    let body = json_body(send(&app, Method::DELETE, "/conversations", None).await).await;
    assert_eq!(body["status"], "success");
    assert!(ctx.memory.all().is_empty());
}

// ============================================================================
// Completion chunks
// ============================================================================

#[tokio::test]
async fn test_stream_ndjson_upload_and_completion() {
    let (_ctx, app) = setup();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/stream/q1")
        .header("content-type", "application/x-ndjson")
        .body(Body::from("{\"delta\":\"a\"}\nnot json\n{\"delta\":\"b\"}\n"))
        .unwrap();
    let body = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(body["chunks_received"], 2);

    let body = json_body(send(&app, Method::POST, "/stream/q1", Some(json!({"delta": "c"}))).await).await;
    assert_eq!(body["chunks_received"], 1);

    let detail = json_body(send(&app, Method::GET, "/stream/q1", None).await).await;
    assert_eq!(detail["complete"], false);
    assert_eq!(detail["chunks"].as_array().unwrap().len(), 3);

    let response = send(&app, Method::POST, "/stream/q1/complete", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let detail = json_body(send(&app, Method::GET, "/stream/q1", None).await).await;
    assert_eq!(detail["query_id"], "q1");
    assert_eq!(detail["complete"], true);
    assert_eq!(detail["chunks"][3], "[DONE]");

    let page = json_body(send(&app, Method::GET, "/stream?query_id=q1&limit=2", None).await).await;
    assert_eq!(page["total"], 4);
    assert_eq!(page["items"][0]["data"]["queryId"], "q1");

    let response = send(&app, Method::GET, "/stream/unknown", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    send(&app, Method::DELETE, "/stream/q1", None).await;
    let response = send(&app, Method::GET, "/stream/q1", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_events_endpoints() {
    let (_ctx, app) = setup();

    let response = send(&app, Method::POST, "/events", Some(json!({"data": {}}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid event");

    for (query, reason) in [("q1", "OperationStarted"), ("q2", "OperationStarted"), ("q1", "OperationCompleted")] {
        let response = send(&app, Method::POST, "/events", Some(sample_event(query, reason))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let all = json_body(send(&app, Method::GET, "/events", None).await).await;
    assert_eq!(all["total_events"], 3);
    assert_eq!(all["events"][0]["data"]["queryName"], "weather");

    let by_query = json_body(send(&app, Method::GET, "/events/q1", None).await).await;
    assert_eq!(by_query["query_id"], "q1");
    assert_eq!(by_query["event_count"], 2);
    assert_eq!(by_query["events"][1]["reason"], "OperationCompleted");

    let body = json_body(send(&app, Method::DELETE, "/events", None).await).await;
    assert_eq!(body["message"], "Event data purged");
    let all = json_body(send(&app, Method::GET, "/events", None).await).await;
    assert_eq!(all["total_events"], 0);
}

// ============================================================================
// Traces
// ============================================================================

#[tokio::test]
async fn test_trace_ingestion() {
    let (_ctx, app) = setup();

    let ndjson = concat!(
        "{\"traceId\":\"t1\",\"spanId\":\"a\",\"name\":\"query\"}\n",
        "{broken\n",
        "{\"traceId\":\"t1\",\"spanId\":\"b\",\"parentSpanId\":\"a\",\"name\":\"model\"}"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/traces")
        .body(Body::from(ndjson))
        .unwrap();
    let body = json_body(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(body["status"], "spans_processed");
    assert_eq!(body["spans_received"], 2);

    let batch = json!({"spans": [{"traceId": "t2", "spanId": "c", "name": "tool"}]});
    let body = json_body(send(&app, Method::POST, "/traces/batch", Some(batch)).await).await;
    assert_eq!(body["spans_received"], 1);

    let response = send(&app, Method::POST, "/traces/batch", Some(json!({"spans": 3}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let summary = json_body(send(&app, Method::GET, "/traces", None).await).await;
    assert_eq!(summary["total_traces"], 2);
    assert_eq!(summary["total_spans"], 3);
    assert_eq!(summary["trace_ids"], json!(["t1", "t2"]));

    let detail = json_body(send(&app, Method::GET, "/traces/t1", None).await).await;
    assert_eq!(detail["span_count"], 2);
    assert_eq!(detail["spans"][1]["parentSpanId"], "a");

    let response = send(&app, Method::GET, "/traces/missing", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Trace not found");
}

// ============================================================================
// SSE live tail
// ============================================================================

#[tokio::test]
async fn test_watch_replays_then_streams_live() {
    let (ctx, app) = setup();
    ctx.events
        .add_event(serde_json::from_value(sample_event("q1", "OperationStarted")).unwrap());
    ctx.events
        .add_event(serde_json::from_value(sample_event("q2", "OperationStarted")).unwrap());

    let response = send(&app, Method::GET, "/events/q1?watch=true&from-beginning=true", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("content-type").unwrap(), "text/event-stream");
    assert_eq!(headers.get("cache-control").unwrap(), "no-cache");
    assert_eq!(headers.get("connection").unwrap(), "keep-alive");
    assert_eq!(ctx.events.log().subscriber_count(), 1);

    let mut stream = response.into_body().into_data_stream();
    let frame = next_frame(&mut stream).await;
    assert!(frame.starts_with("data: "));
    assert!(frame.ends_with("\n\n"));
    let replayed: Value = serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
    assert_eq!(replayed["reason"], "OperationStarted");
    assert_eq!(replayed["data"]["queryId"], "q1");

    ctx.events
        .add_event(serde_json::from_value(sample_event("q2", "Ignored")).unwrap());
    ctx.events
        .add_event(serde_json::from_value(sample_event("q1", "OperationCompleted")).unwrap());

    let frame = next_frame(&mut stream).await;
    let live: Value = serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
    assert_eq!(live["reason"], "OperationCompleted");

    drop(stream);
    assert_eq!(ctx.events.log().subscriber_count(), 0);
}

#[tokio::test]
async fn test_watch_with_cursor_replays_after_cursor() {
    let (ctx, app) = setup();
    for i in 0..4 {
        ctx.memory.add_message("conv1", "q1", json!({ "n": i }));
    }

    let response = send(&app, Method::GET, "/messages?watch=true&cursor=2", None).await;
    let mut stream = response.into_body().into_data_stream();

    let first: Value =
        serde_json::from_str(next_frame(&mut stream).await.trim_start_matches("data: ").trim()).unwrap();
    let second: Value =
        serde_json::from_str(next_frame(&mut stream).await.trim_start_matches("data: ").trim()).unwrap();
    assert_eq!(first["sequence"], 3);
    assert_eq!(second["sequence"], 4);
    assert_eq!(second["conversation_id"], "conv1");
}

#[tokio::test]
async fn test_watch_rejects_bad_cursor() {
    let (ctx, app) = setup();
    let response = send(&app, Method::GET, "/messages?watch=true&cursor=x", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.memory.log().subscriber_count(), 0);
}

#[tokio::test]
async fn test_heartbeat_comment() {
    let ctx = Arc::new(AppContext::in_memory().with_heartbeat(Duration::from_millis(20)));
    let app = create_router(Arc::clone(&ctx));

    let response = send(&app, Method::GET, "/traces?watch=true", None).await;
    let mut stream = response.into_body().into_data_stream();

    assert_eq!(next_frame(&mut stream).await, ": heartbeat\n\n");
    assert_eq!(next_frame(&mut stream).await, ": heartbeat\n\n");
}

#[tokio::test]
async fn test_watch_outlives_heartbeat_interval() {
    let ctx = Arc::new(AppContext::in_memory().with_heartbeat(Duration::from_millis(25)));
    let app = create_router(Arc::clone(&ctx));

    // The handler has returned by the time the response is in hand
    let response = send(&app, Method::GET, "/traces/t1?watch=true", None).await;
    let mut stream = response.into_body().into_data_stream();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(ctx.traces.log().subscriber_count(), 1);

    for span_id in ["a", "b"] {
        ctx.traces.add_span(
            serde_json::from_value(json!({"traceId": "t1", "spanId": span_id, "name": "step"})).unwrap(),
        );
    }

    let mut span_ids = Vec::new();
    let mut heartbeats = 0;
    while span_ids.len() < 2 {
        let frame = next_frame(&mut stream).await;
        if frame == ": heartbeat\n\n" {
            heartbeats += 1;
            continue;
        }
        let span: Value = serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
        span_ids.push(span["spanId"].as_str().unwrap().to_string());
    }
    assert!(heartbeats >= 1);
    assert_eq!(span_ids, vec!["a", "b"]);

    tokio::time::sleep(Duration::from_millis(40)).await;
    ctx.traces.add_span(
        serde_json::from_value(json!({"traceId": "t1", "spanId": "c", "name": "step"})).unwrap(),
    );
    loop {
        let frame = next_frame(&mut stream).await;
        if frame.starts_with("data: ") {
            assert!(frame.contains("\"spanId\":\"c\""));
            break;
        }
    }
}

#[tokio::test]
async fn test_chunk_watch_streams_raw_chunks() {
    let (ctx, app) = setup();
    ctx.chunks.add_chunk("q1", json!({"delta": "first"}));

    let response = send(&app, Method::GET, "/stream/q1?watch=true&from-beginning=true", None).await;
    let mut stream = response.into_body().into_data_stream();

    assert_eq!(next_frame(&mut stream).await, "data: {\"delta\":\"first\"}\n\n");

    ctx.chunks.complete_query("q1");
    assert_eq!(next_frame(&mut stream).await, "data: \"[DONE]\"\n\n");
}

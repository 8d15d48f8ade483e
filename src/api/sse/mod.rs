//! Server-Sent Events live tail
//!
//! Turns a log subscription into a long-lived `text/event-stream` response.
//! Each item is one `data: <JSON>` frame; a `: heartbeat` comment is written
//! on a fixed interval regardless of traffic. When the client goes away the
//! response stream is dropped, which drops the subscription.
//!
//! ```text
//! KeyedLog::append ──► callback (serialize + enqueue) ──► mpsc ──► stream! ──► client
//!                                                          ▲
//!                                      heartbeat interval ─┘
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::event_store::{Keyed, KeyedLog, Replay, Scope, Subscription};
use crate::types::Item;

/// Keeps the subscription alive for the life of the response and reports
/// the disconnect once
struct TailGuard<T> {
    tag: &'static str,
    subscription: Option<Subscription<T>>,
    delivered: usize,
}

impl<T> Drop for TailGuard<T> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        info!(tag = self.tag, delivered = self.delivered, "SSE client disconnected");
    }
}

fn encode<P: Serialize>(tag: &'static str, payload: &P) -> Option<String> {
    match serde_json::to_string(payload) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(tag, error = %e, "failed to serialize SSE frame, skipping");
            None
        }
    }
}

/// Stream `log` to an SSE client.
///
/// `replay` items are sent first, then every live item in `scope`. Replay
/// and subscription happen in one step so nothing is missed or repeated in
/// between. `project` chooses what each frame carries.
pub fn live_tail<T, P, F>(
    tag: &'static str,
    log: &KeyedLog<T>,
    scope: Scope,
    replay: Replay,
    heartbeat: Duration,
    project: F,
) -> Response
where
    T: Keyed + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    P: Serialize,
    F: Fn(&Item<T>) -> P + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let project = Arc::new(project);

    let live_project = Arc::clone(&project);
    let (backlog, subscription) = log.subscribe_with_replay(scope.clone(), replay, move |item| {
        if let Some(frame) = encode(tag, &live_project(item)) {
            // The receiver only disappears together with the subscription
            let _ = tx.send(frame);
        }
    });

    let replayed: Vec<String> = backlog
        .iter()
        .filter_map(|item| encode(tag, &project(item)))
        .collect();
    info!(tag, scope = ?scope, replayed = replayed.len(), "SSE client connected");

    let guard = TailGuard {
        tag,
        subscription: Some(subscription),
        delivered: 0,
    };

    let stream = async_stream::stream! {
        // Bind the whole guard so it lives exactly as long as the response body
        let mut guard = guard;

        for frame in replayed {
            guard.delivered += 1;
            yield Ok::<_, Infallible>(Event::default().data(frame));
        }

        let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        guard.delivered += 1;
                        Event::default().data(frame)
                    }
                    None => break,
                },
                _ = ticker.tick() => Event::default().comment("heartbeat"),
            };
            yield Ok(event);
        }
    };

    ([(header::CONNECTION, "keep-alive")], Sse::new(stream)).into_response()
}

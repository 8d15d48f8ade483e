//! REST API module for HTTP endpoints
//!
//! Route groups, one per broker:
//! - `memory`: `/messages`, `/conversations`, `/memory-status`
//! - `stream`: `/stream` completion chunks
//! - `events`: `/events` operation events
//! - `traces`: `/traces` OTEL spans
//!
//! Every list endpoint accepts `watch=true` to switch to an SSE live tail.

pub mod events;
pub mod memory;
pub mod stream;
pub mod traces;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::event_store::Replay;
use crate::types::{parse_cursor, PageParams, PaginationError};

/// Query parameters shared by list and watch endpoints.
///
/// Numbers are kept as raw strings so bad values produce a pagination error
/// rather than a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub limit: Option<String>,
    pub cursor: Option<String>,
    pub watch: Option<String>,
    #[serde(rename = "from-beginning")]
    pub from_beginning: Option<String>,
    pub conversation_id: Option<String>,
    pub query_id: Option<String>,
}

impl StreamQuery {
    pub fn watching(&self) -> bool {
        self.watch.as_deref() == Some("true")
    }

    pub fn page_params(&self) -> Result<PageParams, PaginationError> {
        PageParams::from_query(self.limit.as_deref(), self.cursor.as_deref())
    }

    /// What a watcher should see before live items: a `cursor` wins over
    /// `from-beginning`
    pub fn replay(&self) -> Result<Replay, PaginationError> {
        if let Some(raw) = self.cursor.as_deref() {
            return Ok(Replay::After(parse_cursor(raw)?));
        }
        if self.from_beginning.as_deref() == Some("true") {
            return Ok(Replay::FromBeginning);
        }
        Ok(Replay::Nothing)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// `{"status": "success", "message": ...}` acknowledgement
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
        })
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: message.into(),
            code: "NOT_FOUND".to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
            code: "BAD_REQUEST".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: message.into(),
            code: "INTERNAL_ERROR".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<PaginationError> for ApiError {
    fn from(e: PaginationError) -> Self {
        Self::bad_request(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

//! Conversation memory endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{ApiError, ApiResult, StatusMessage, StreamQuery};
use crate::api::sse::live_tail;
use crate::api::state::AppContext;
use crate::brokers::{MemoryStatus, MessageFilter};
use crate::event_store::Scope;
use crate::types::{MessageRecord, Page};

/// Request body for POST /messages
#[derive(Debug, Deserialize)]
pub struct AddMessagesRequest {
    pub conversation_id: Option<String>,
    pub query_id: Option<String>,
    pub messages: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub conversations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedConversation {
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    pub conversation_id: String,
    pub messages: Vec<MessageRecord>,
}

/// POST /messages - Store messages for a conversation/query pair
pub async fn add_messages(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<AddMessagesRequest>,
) -> ApiResult<StatusCode> {
    let conversation_id = body
        .conversation_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("conversation_id is required"))?;
    let query_id = body
        .query_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("query_id is required"))?;
    let Some(Value::Array(messages)) = body.messages else {
        return Err(ApiError::bad_request("messages array is required"));
    };

    info!(
        conversation_id = %conversation_id,
        query_id = %query_id,
        messages = messages.len(),
        "storing messages"
    );

    ctx.memory.add_messages(&conversation_id, &query_id, messages);
    ctx.memory.save();

    Ok(StatusCode::OK)
}

/// GET /messages - Paginated messages, or a live tail with `watch=true`
pub async fn list_messages(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    if query.watching() {
        let replay = query.replay()?;
        let scope = match query.conversation_id() {
            Some(id) => Scope::key(id),
            None => Scope::All,
        };
        return Ok(live_tail(
            "MESSAGES",
            ctx.memory.log(),
            scope,
            replay,
            ctx.heartbeat,
            |item| MessageRecord::from(item),
        ));
    }

    let params = query.page_params()?;
    let filter = MessageFilter {
        conversation_id: query.conversation_id().map(str::to_string),
        query_id: query.query_id().map(str::to_string),
    };
    let page: Page<MessageRecord> = ctx
        .memory
        .paginate(params, &filter)
        .map(|item| MessageRecord::from(&item));

    Ok(Json(page).into_response())
}

/// DELETE /messages - Purge all memory
pub async fn purge_messages(State(ctx): State<Arc<AppContext>>) -> Json<StatusMessage> {
    ctx.memory.delete();
    StatusMessage::success("Memory purged")
}

/// GET /memory-status - Message and query counts per conversation
pub async fn memory_status(State(ctx): State<Arc<AppContext>>) -> Json<MemoryStatus> {
    Json(ctx.memory.status())
}

/// GET /conversations - Known conversation IDs
pub async fn list_conversations(State(ctx): State<Arc<AppContext>>) -> Json<ConversationList> {
    Json(ConversationList {
        conversations: ctx.memory.conversation_ids(),
    })
}

/// POST /conversations - Allocate a new conversation ID
pub async fn create_conversation() -> (StatusCode, Json<CreatedConversation>) {
    (
        StatusCode::CREATED,
        Json(CreatedConversation {
            conversation_id: Uuid::new_v4().to_string(),
        }),
    )
}

/// GET /conversations/:conversation_id - Messages of one conversation
pub async fn get_conversation(
    State(ctx): State<Arc<AppContext>>,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<ConversationDetail>> {
    let items = ctx.memory.get_by_conversation(&conversation_id);
    if items.is_empty() {
        return Err(ApiError::not_found("Conversation not found"));
    }

    Ok(Json(ConversationDetail {
        conversation_id,
        messages: items.iter().map(MessageRecord::from).collect(),
    }))
}

/// DELETE /conversations - Remove every conversation
pub async fn delete_all_conversations(State(ctx): State<Arc<AppContext>>) -> Json<StatusMessage> {
    ctx.memory.delete();
    StatusMessage::success("All conversations deleted")
}

/// DELETE /conversations/:conversation_id
pub async fn delete_conversation(
    State(ctx): State<Arc<AppContext>>,
    Path(conversation_id): Path<String>,
) -> Json<StatusMessage> {
    ctx.memory.delete_conversation(&conversation_id);
    StatusMessage::success(format!("Conversation {} deleted", conversation_id))
}

/// DELETE /conversations/:conversation_id/queries/:query_id/messages
pub async fn delete_query_messages(
    State(ctx): State<Arc<AppContext>>,
    Path((conversation_id, query_id)): Path<(String, String)>,
) -> Json<StatusMessage> {
    ctx.memory.delete_query(&conversation_id, &query_id);
    StatusMessage::success(format!(
        "Query {} messages deleted from conversation {}",
        query_id, conversation_id
    ))
}

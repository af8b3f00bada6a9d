use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use reclaim_db::Database;
use reclaim_db::models::{MessageRow, ThreadMessageRow};
use reclaim_types::api::{
    MessageResponse, SendMessageRequest, Success, ThreadItemRef, ThreadResponse, UserRef,
};
use reclaim_types::models::Principal;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::{parse_ts, parse_uuid};

// -- Handlers --

pub async fn send(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let message = blocking(move || send_message(&db.db, &principal, req)).await?;
    Ok((StatusCode::CREATED, Json(Success::new(message))))
}

pub async fn conversation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((item_id, other_user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let messages =
        blocking(move || get_conversation(&db.db, &principal, item_id, other_user_id)).await?;
    Ok(Json(Success::new(messages)))
}

pub async fn threads(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let threads = blocking(move || list_threads(&db.db, &principal)).await?;
    Ok(Json(Success::new(threads)))
}

// -- Operations --

pub fn send_message(
    db: &Database,
    principal: &Principal,
    req: SendMessageRequest,
) -> ApiResult<MessageResponse> {
    if req.receiver_id == principal.id {
        return Err(ApiError::validation("You cannot message yourself"));
    }
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::validation("Please add a message text"));
    }

    let id = Uuid::new_v4();
    db.insert_message(
        &id.to_string(),
        &req.item_id.to_string(),
        &principal.id.to_string(),
        &req.receiver_id.to_string(),
        text,
    )?;

    debug!(
        "Message sent from {} to {} for item {}",
        principal.id, req.receiver_id, req.item_id
    );

    let row = db
        .message_by_id(&id.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("message vanished after insert")))?;
    Ok(message_response(row))
}

/// The (item, pair) conversation, oldest first. Reading it marks every
/// message addressed to the caller as read, so the returned rows already
/// carry the flipped flag and a second call is a no-op. A caller who is not
/// one of the two participants just gets an empty list.
pub fn get_conversation(
    db: &Database,
    principal: &Principal,
    item_id: Uuid,
    other_user_id: Uuid,
) -> ApiResult<Vec<MessageResponse>> {
    let item = item_id.to_string();
    let me = principal.id.to_string();
    let other = other_user_id.to_string();

    db.mark_conversation_read(&item, &other, &me)?;

    let rows = db.conversation(&item, &me, &other)?;
    debug!(
        "Fetched {} messages between {} and {} for item {}",
        rows.len(),
        me,
        other,
        item
    );

    Ok(rows.into_iter().map(message_response).collect())
}

/// Inbox view: one entry per (item, counterpart) pair, newest first.
pub fn list_threads(db: &Database, principal: &Principal) -> ApiResult<Vec<ThreadResponse>> {
    let rows = db.messages_touching(&principal.id.to_string())?;
    let threads = collapse_threads(rows, &principal.id.to_string());
    debug!("Fetched {} chat threads for user {}", threads.len(), principal.id);
    Ok(threads)
}

/// Ordered fold over a time-descending message list: the first message seen
/// for a (item, counterpart) key is the most recent one and becomes the
/// thread's preview; everything after it for that key is dropped. `unread`
/// therefore reflects only the latest message, never a count.
fn collapse_threads(rows: Vec<ThreadMessageRow>, me: &str) -> Vec<ThreadResponse> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut threads = Vec::new();

    for row in rows {
        let (other_id, other_name, other_username) = if row.sender_id == me {
            (&row.receiver_id, &row.receiver_name, &row.receiver_username)
        } else {
            (&row.sender_id, &row.sender_name, &row.sender_username)
        };

        if !seen.insert((row.item_id.clone(), other_id.clone())) {
            continue;
        }

        threads.push(ThreadResponse {
            item: ThreadItemRef {
                id: parse_uuid(&row.item_id, "thread item"),
                title: row.item_title.clone(),
            },
            other_user: UserRef {
                id: parse_uuid(other_id, "thread counterpart"),
                name: other_name.clone(),
                username: other_username.clone(),
            },
            last_message: row.text,
            timestamp: parse_ts(&row.created_at, "thread message"),
            unread: !row.read && row.receiver_id == me,
        });
    }

    threads
}

fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: parse_uuid(&row.id, "message"),
        item_id: parse_uuid(&row.item_id, "message item"),
        sender_id: parse_uuid(&row.sender_id, "message sender"),
        receiver_id: parse_uuid(&row.receiver_id, "message receiver"),
        text: row.text,
        read: row.read,
        created_at: parse_ts(&row.created_at, "message"),
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ClaimDecision, ClaimStatus, ItemCategory, ItemKind, ItemStatus, Role};

// -- JWT Claims --

/// Bearer-token claims. Only the subject id is trusted from the token; the
/// role is re-read from the store on every request so a promotion or demotion
/// takes effect without reissuing tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Response envelope --

/// Every successful response is `{ "success": true, "data": ... }`; failures
/// render `{ "success": false, "message": ... }` from the error type.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub role: Role,
}

/// The subset of a user joined onto items, claims and threads.
#[derive(Debug, Clone, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

// -- Items --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
    pub location: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ItemCategory>,
    pub location: Option<String>,
    pub kind: Option<ItemKind>,
    pub status: Option<ItemStatus>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ItemCategory,
    pub location: String,
    pub kind: ItemKind,
    pub status: ItemStatus,
    pub images: Vec<String>,
    pub posted_by: UserRef,
    pub created_at: DateTime<Utc>,
}

// -- Claims --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateClaimRequest {
    pub item_id: Uuid,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateClaimRequest {
    pub status: ClaimDecision,
    pub owner_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub claimant_id: Uuid,
    pub description: String,
    pub status: ClaimStatus,
    pub owner_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A claim as seen by the item's owner: joined with the claimant's identity
/// and enough of the item to render a review card.
#[derive(Debug, Serialize)]
pub struct IncomingClaimResponse {
    pub id: Uuid,
    pub description: String,
    pub status: ClaimStatus,
    pub owner_message: Option<String>,
    pub claimant: UserRef,
    pub item: ClaimedItemRef,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ClaimedItemRef {
    pub id: Uuid,
    pub title: String,
    pub kind: ItemKind,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub item_id: Uuid,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// One conversation in the inbox view: the latest message for a given
/// (item, counterpart) pair. `unread` reflects only that latest message.
#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub item: ThreadItemRef,
    pub other_user: UserRef,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    pub unread: bool,
}

#[derive(Debug, Serialize)]
pub struct ThreadItemRef {
    pub id: Uuid,
    pub title: String,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub message: String,
    pub related_item_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

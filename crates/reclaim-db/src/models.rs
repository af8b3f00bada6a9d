/// Database row types — these map directly to SQLite rows. Distinct from the
/// reclaim-types API models to keep the storage layer independent; ids and
/// timestamps stay as TEXT here and are parsed at the API boundary.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

/// Item joined with its poster's public identity.
pub struct ItemRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub kind: String,
    pub status: String,
    pub images: String,
    pub posted_by: String,
    pub poster_name: String,
    pub poster_username: String,
    pub created_at: String,
}

pub struct ClaimRow {
    pub id: String,
    pub item_id: String,
    pub claimant_id: String,
    pub description: String,
    pub status: String,
    pub owner_message: Option<String>,
    pub created_at: String,
}

/// Claim joined with claimant identity and item title/kind, for the owner's
/// review list. Rows only exist while the item does (inner join).
pub struct IncomingClaimRow {
    pub id: String,
    pub description: String,
    pub status: String,
    pub owner_message: Option<String>,
    pub claimant_id: String,
    pub claimant_name: String,
    pub claimant_username: String,
    pub item_id: String,
    pub item_title: String,
    pub item_kind: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub item_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub read: bool,
    pub created_at: String,
}

/// Message joined with both participants and the item, feeding the thread
/// fold. Inner joins silently drop messages whose item or either user is
/// gone, which is exactly the skip behavior the inbox wants.
pub struct ThreadMessageRow {
    pub id: String,
    pub item_id: String,
    pub item_title: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_username: String,
    pub receiver_id: String,
    pub receiver_name: String,
    pub receiver_username: String,
    pub text: String,
    pub read: bool,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub recipient_id: String,
    pub message: String,
    pub related_item_id: String,
    pub is_read: bool,
    pub created_at: String,
}

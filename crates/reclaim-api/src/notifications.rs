use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use reclaim_db::Database;
use reclaim_types::api::{NotificationResponse, Success};
use reclaim_types::models::Principal;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::{parse_ts, parse_uuid};

// -- Handlers --

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let notifications = blocking(move || list_notifications(&db.db, &principal)).await?;
    Ok(Json(Success::new(notifications)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(_principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    blocking(move || mark_notification_read(&db.db, id)).await?;
    Ok(Json(Success::new(serde_json::json!({}))))
}

// -- Operations --

pub fn list_notifications(
    db: &Database,
    principal: &Principal,
) -> ApiResult<Vec<NotificationResponse>> {
    let rows = db.notifications_for(&principal.id.to_string())?;
    Ok(rows
        .into_iter()
        .map(|row| NotificationResponse {
            id: parse_uuid(&row.id, "notification"),
            message: row.message,
            related_item_id: parse_uuid(&row.related_item_id, "notification item"),
            is_read: row.is_read,
            created_at: parse_ts(&row.created_at, "notification"),
        })
        .collect())
}

pub fn mark_notification_read(db: &Database, id: Uuid) -> ApiResult<()> {
    if !db.mark_notification_read(&id.to_string())? {
        return Err(ApiError::NotFound("Notification"));
    }
    Ok(())
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use reclaim_db::Database;
use reclaim_db::models::ItemRow;
use reclaim_db::queries::{ItemFilter, SortKey};
use reclaim_types::api::{
    CreateItemRequest, ItemResponse, Success, UpdateItemRequest, UserRef,
};
use reclaim_types::models::{ItemCategory, ItemKind, ItemStatus, Principal};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::{parse_stored, parse_ts, parse_uuid};

#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    pub category: Option<ItemCategory>,
    pub kind: Option<ItemKind>,
    pub status: Option<ItemStatus>,
    pub location: Option<String>,
    pub posted_by: Option<Uuid>,
    pub search: Option<String>,
    /// Comma-separated whitelist fields, `-` prefix for descending,
    /// e.g. `sort=-created_at,title`. Defaults to newest first.
    pub sort: Option<String>,
}

// -- Handlers --

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let items = blocking(move || list_items(&db.db, query)).await?;
    Ok(Json(Success::new(items)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let item = blocking(move || get_item(&db.db, id)).await?;
    Ok(Json(Success::new(item)))
}

pub async fn mine(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let items = blocking(move || list_my_items(&db.db, &principal)).await?;
    Ok(Json(Success::new(items)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let item = blocking(move || create_item(&db.db, &principal, req)).await?;
    Ok((StatusCode::CREATED, Json(Success::new(item))))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let item = blocking(move || update_item(&db.db, &principal, id, req)).await?;
    Ok(Json(Success::new(item)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    blocking(move || delete_item(&db.db, &principal, id)).await?;
    Ok(Json(Success::new(serde_json::json!({}))))
}

// -- Operations --

pub fn list_items(db: &Database, query: ItemListQuery) -> ApiResult<Vec<ItemResponse>> {
    let sort = match &query.sort {
        None => Vec::new(),
        Some(spec) => spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                SortKey::parse(s)
                    .ok_or_else(|| ApiError::validation(format!("Unknown sort field: '{}'", s)))
            })
            .collect::<ApiResult<Vec<_>>>()?,
    };

    let filter = ItemFilter {
        category: query.category.map(|c| c.as_str().to_string()),
        kind: query.kind.map(|k| k.as_str().to_string()),
        status: query.status.map(|s| s.as_str().to_string()),
        location: query.location,
        posted_by: query.posted_by.map(|id| id.to_string()),
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        sort,
    };

    db.list_items(&filter)?
        .into_iter()
        .map(item_response)
        .collect()
}

pub fn get_item(db: &Database, id: Uuid) -> ApiResult<ItemResponse> {
    let row = db
        .item_by_id(&id.to_string())?
        .ok_or(ApiError::NotFound("Item"))?;
    item_response(row)
}

pub fn list_my_items(db: &Database, principal: &Principal) -> ApiResult<Vec<ItemResponse>> {
    db.items_by_poster(&principal.id.to_string())?
        .into_iter()
        .map(item_response)
        .collect()
}

pub fn create_item(
    db: &Database,
    principal: &Principal,
    req: CreateItemRequest,
) -> ApiResult<ItemResponse> {
    let title = req.title.trim();
    let description = req.description.trim();
    let location = req.location.trim();

    if title.is_empty() {
        return Err(ApiError::validation("Please provide a title"));
    }
    if description.is_empty() {
        return Err(ApiError::validation("Please provide a description"));
    }
    if location.is_empty() {
        return Err(ApiError::validation(
            "Please provide the location where it was found/lost",
        ));
    }

    let id = Uuid::new_v4();
    let images_json = serde_json::to_string(&req.images)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("encode images: {}", e)))?;

    db.insert_item(
        &id.to_string(),
        title,
        description,
        req.category.as_str(),
        location,
        req.kind.as_str(),
        &images_json,
        &principal.id.to_string(),
    )?;

    get_item(db, id)
}

/// Partial update; absent fields keep their stored value. Owner or admin
/// only, and every provided field is re-validated.
pub fn update_item(
    db: &Database,
    principal: &Principal,
    id: Uuid,
    req: UpdateItemRequest,
) -> ApiResult<ItemResponse> {
    let row = db
        .item_by_id(&id.to_string())?
        .ok_or(ApiError::NotFound("Item"))?;
    authorize_owner(&row, principal)?;

    let title = match req.title {
        Some(t) if t.trim().is_empty() => {
            return Err(ApiError::validation("Please provide a title"));
        }
        Some(t) => t.trim().to_string(),
        None => row.title,
    };
    let description = match req.description {
        Some(d) if d.trim().is_empty() => {
            return Err(ApiError::validation("Please provide a description"));
        }
        Some(d) => d.trim().to_string(),
        None => row.description,
    };
    let location = match req.location {
        Some(l) if l.trim().is_empty() => {
            return Err(ApiError::validation(
                "Please provide the location where it was found/lost",
            ));
        }
        Some(l) => l.trim().to_string(),
        None => row.location,
    };
    let category = req
        .category
        .map(|c| c.as_str().to_string())
        .unwrap_or(row.category);
    let kind = req.kind.map(|k| k.as_str().to_string()).unwrap_or(row.kind);
    let status = req
        .status
        .map(|s| s.as_str().to_string())
        .unwrap_or(row.status);
    let images_json = match req.images {
        Some(images) => serde_json::to_string(&images)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("encode images: {}", e)))?,
        None => row.images,
    };

    db.update_item(
        &row.id,
        &title,
        &description,
        &category,
        &location,
        &kind,
        &status,
        &images_json,
    )?;

    get_item(db, id)
}

pub fn delete_item(db: &Database, principal: &Principal, id: Uuid) -> ApiResult<()> {
    let row = db
        .item_by_id(&id.to_string())?
        .ok_or(ApiError::NotFound("Item"))?;
    authorize_owner(&row, principal)?;

    db.delete_item(&row.id)?;
    Ok(())
}

fn authorize_owner(row: &ItemRow, principal: &Principal) -> ApiResult<()> {
    if row.posted_by != principal.id.to_string() && !principal.is_admin() {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

fn item_response(row: ItemRow) -> ApiResult<ItemResponse> {
    let images: Vec<String> = serde_json::from_str(&row.images).unwrap_or_else(|e| {
        warn!("Corrupt images on item '{}': {}", row.id, e);
        Vec::new()
    });

    Ok(ItemResponse {
        id: parse_uuid(&row.id, "item"),
        title: row.title,
        description: row.description,
        category: parse_stored(&row.category)?,
        location: row.location,
        kind: parse_stored(&row.kind)?,
        status: parse_stored(&row.status)?,
        images,
        posted_by: UserRef {
            id: parse_uuid(&row.posted_by, "item poster"),
            name: row.poster_name,
            username: row.poster_username,
        },
        created_at: parse_ts(&row.created_at, "item"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_user, test_db};
    use reclaim_types::models::Role;

    fn wallet_req() -> CreateItemRequest {
        CreateItemRequest {
            title: "Black wallet".into(),
            description: "Leather, worn at the corners".into(),
            category: ItemCategory::Wallets,
            location: "Main library, floor 2".into(),
            kind: ItemKind::Lost,
            images: vec!["/uploads/wallet.jpg".into()],
        }
    }

    #[test]
    fn create_sets_poster_and_active_status() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);

        let item = create_item(&db, &ada, wallet_req()).unwrap();
        assert_eq!(item.posted_by.id, ada.id);
        assert_eq!(item.status, ItemStatus::Active);
        assert_eq!(item.images, vec!["/uploads/wallet.jpg".to_string()]);
    }

    #[test]
    fn create_rejects_blank_required_fields() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);

        let mut req = wallet_req();
        req.title = "   ".into();
        assert!(matches!(
            create_item(&db, &ada, req),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn only_owner_or_admin_may_update() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);
        let moderator = seed_user(&db, "Mod", "moderator", Role::Admin);

        let item = create_item(&db, &ada, wallet_req()).unwrap();

        let update = |by: &Principal, title: &str| {
            update_item(
                &db,
                by,
                item.id,
                UpdateItemRequest {
                    title: Some(title.into()),
                    ..Default::default()
                },
            )
        };

        assert!(matches!(
            update(&bob, "Bob's now"),
            Err(ApiError::Unauthorized)
        ));
        assert_eq!(update(&ada, "Black leather wallet").unwrap().title, "Black leather wallet");
        assert_eq!(update(&moderator, "Moderated title").unwrap().title, "Moderated title");
    }

    #[test]
    fn only_owner_or_admin_may_delete() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);
        let moderator = seed_user(&db, "Mod", "moderator", Role::Admin);

        let item = create_item(&db, &ada, wallet_req()).unwrap();
        assert!(matches!(
            delete_item(&db, &bob, item.id),
            Err(ApiError::Unauthorized)
        ));
        delete_item(&db, &moderator, item.id).unwrap();
        assert!(matches!(
            get_item(&db, item.id),
            Err(ApiError::NotFound("Item"))
        ));
    }

    #[test]
    fn missing_item_is_not_found() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let ghost = Uuid::new_v4();
        assert!(matches!(get_item(&db, ghost), Err(ApiError::NotFound("Item"))));
        assert!(matches!(
            delete_item(&db, &ada, ghost),
            Err(ApiError::NotFound("Item"))
        ));
    }

    #[test]
    fn list_rejects_unknown_sort_fields() {
        let db = test_db();
        let query = ItemListQuery {
            sort: Some("-created_at,password".into()),
            ..Default::default()
        };
        assert!(matches!(
            list_items(&db, query),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn list_filters_on_location_and_poster() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);

        create_item(&db, &ada, wallet_req()).unwrap();
        let mut bob_req = wallet_req();
        bob_req.title = "Umbrella".into();
        bob_req.location = "Bus stop".into();
        create_item(&db, &bob, bob_req).unwrap();

        let at_bus_stop = list_items(
            &db,
            ItemListQuery {
                location: Some("Bus stop".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(at_bus_stop.len(), 1);
        assert_eq!(at_bus_stop[0].title, "Umbrella");

        let by_ada = list_items(
            &db,
            ItemListQuery {
                posted_by: Some(ada.id),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_ada.len(), 1);
        assert_eq!(by_ada[0].posted_by.id, ada.id);
    }

    #[test]
    fn mine_returns_only_the_callers_items() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);

        create_item(&db, &ada, wallet_req()).unwrap();
        let mut bob_req = wallet_req();
        bob_req.title = "Calculus textbook".into();
        bob_req.category = ItemCategory::Books;
        create_item(&db, &bob, bob_req).unwrap();

        let mine = list_my_items(&db, &ada).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Black wallet");
    }
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use reclaim_db::Database;
use reclaim_db::models::ClaimRow;
use reclaim_types::api::{
    ClaimResponse, ClaimedItemRef, CreateClaimRequest, IncomingClaimResponse, Success,
    UpdateClaimRequest, UserRef,
};
use reclaim_types::models::{ClaimStatus, ItemStatus, Principal};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::{parse_stored, parse_ts, parse_uuid};

// -- Handlers --

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateClaimRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let claim = blocking(move || create_claim(&db.db, &principal, req)).await?;
    Ok((StatusCode::CREATED, Json(Success::new(claim))))
}

pub async fn incoming(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let claims = blocking(move || list_incoming(&db.db, &principal)).await?;
    Ok(Json(Success::new(claims)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClaimRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let claim = blocking(move || update_claim_status(&db.db, &principal, id, req)).await?;
    Ok(Json(Success::new(claim)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    blocking(move || delete_claim(&db.db, &principal, id)).await?;
    Ok(Json(Success::new(serde_json::json!({}))))
}

// -- Operations --

/// Files a pending claim against an existing item and notifies its owner.
/// Claiming your own item is rejected.
pub fn create_claim(
    db: &Database,
    principal: &Principal,
    req: CreateClaimRequest,
) -> ApiResult<ClaimResponse> {
    let description = req.description.trim();
    if description.is_empty() {
        return Err(ApiError::validation(
            "Please provide details to prove this item belongs to you",
        ));
    }

    let item = db
        .item_by_id(&req.item_id.to_string())?
        .ok_or(ApiError::NotFound("Item"))?;

    if item.posted_by == principal.id.to_string() {
        return Err(ApiError::validation("You cannot claim your own item"));
    }

    let id = Uuid::new_v4();
    db.insert_claim(
        &id.to_string(),
        &item.id,
        &principal.id.to_string(),
        description,
    )?;

    // Notify the item owner
    db.insert_notification(
        &Uuid::new_v4().to_string(),
        &item.posted_by,
        &format!("Someone is claiming your item: {}", item.title),
        &item.id,
    )?;

    let claim = db
        .claim_by_id(&id.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("claim vanished after insert")))?;
    claim_response(claim)
}

/// Claims against the acting user's items, joined with claimant identity and
/// item title/kind.
pub fn list_incoming(db: &Database, principal: &Principal) -> ApiResult<Vec<IncomingClaimResponse>> {
    db.claims_for_owner(&principal.id.to_string())?
        .into_iter()
        .map(|row| {
            Ok(IncomingClaimResponse {
                id: parse_uuid(&row.id, "claim"),
                description: row.description,
                status: parse_stored(&row.status)?,
                owner_message: row.owner_message,
                claimant: UserRef {
                    id: parse_uuid(&row.claimant_id, "claimant"),
                    name: row.claimant_name,
                    username: row.claimant_username,
                },
                item: ClaimedItemRef {
                    id: parse_uuid(&row.item_id, "claimed item"),
                    title: row.item_title,
                    kind: parse_stored(&row.item_kind)?,
                },
                created_at: parse_ts(&row.created_at, "claim"),
            })
        })
        .collect()
}

/// The owner's ruling on a claim. Three independent writes run in order and
/// a failure aborts the remaining steps; nothing is rolled back:
/// 1. claim status + owner message,
/// 2. notification to the claimant,
/// 3. on approval, the item is forced to `claimed` whatever its prior state.
///
/// There is no guard against re-ruling a claim that is already terminal; the
/// last write wins.
pub fn update_claim_status(
    db: &Database,
    principal: &Principal,
    claim_id: Uuid,
    req: UpdateClaimRequest,
) -> ApiResult<ClaimResponse> {
    let claim = db
        .claim_by_id(&claim_id.to_string())?
        .ok_or(ApiError::NotFound("Claim"))?;

    let item = db
        .item_by_id(&claim.item_id)?
        .ok_or_else(|| ApiError::integrity("Associated item no longer exists"))?;

    if item.posted_by != principal.id.to_string() {
        return Err(ApiError::Unauthorized);
    }

    let status: ClaimStatus = req.status.into();
    db.set_claim_status(&claim.id, status.as_str(), req.owner_message.as_deref())?;

    // Notify the claimant
    db.insert_notification(
        &Uuid::new_v4().to_string(),
        &claim.claimant_id,
        &format!("Your claim for {} has been {}.", item.title, status.as_str()),
        &item.id,
    )?;

    if status == ClaimStatus::Approved {
        db.set_item_status(&item.id, ItemStatus::Claimed.as_str())?;
    }

    let updated = db
        .claim_by_id(&claim.id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("claim vanished during update")))?;
    claim_response(updated)
}

/// Admin-only moderation delete; no cascading notification.
pub fn delete_claim(db: &Database, principal: &Principal, id: Uuid) -> ApiResult<()> {
    if !principal.is_admin() {
        return Err(ApiError::Unauthorized);
    }
    if !db.delete_claim(&id.to_string())? {
        return Err(ApiError::NotFound("Claim"));
    }
    Ok(())
}

fn claim_response(row: ClaimRow) -> ApiResult<ClaimResponse> {
    Ok(ClaimResponse {
        id: parse_uuid(&row.id, "claim"),
        item_id: parse_uuid(&row.item_id, "claim item"),
        claimant_id: parse_uuid(&row.claimant_id, "claimant"),
        description: row.description,
        status: parse_stored(&row.status)?,
        owner_message: row.owner_message,
        created_at: parse_ts(&row.created_at, "claim"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{create_item, get_item};
    use crate::testutil::{seed_user, test_db};
    use reclaim_types::api::CreateItemRequest;
    use reclaim_types::models::{ClaimDecision, ItemCategory, ItemKind, Role};

    fn post_item(db: &Database, by: &Principal, title: &str) -> Uuid {
        create_item(
            db,
            by,
            CreateItemRequest {
                title: title.into(),
                description: "Hard shell case with stickers".into(),
                category: ItemCategory::Electronics,
                location: "Physics block".into(),
                kind: ItemKind::Found,
                images: vec![],
            },
        )
        .unwrap()
        .id
    }

    fn claim_req(item_id: Uuid, description: &str) -> CreateClaimRequest {
        CreateClaimRequest {
            item_id,
            description: description.into(),
        }
    }

    fn decide(status: ClaimDecision, owner_message: Option<&str>) -> UpdateClaimRequest {
        UpdateClaimRequest {
            status,
            owner_message: owner_message.map(String::from),
        }
    }

    #[test]
    fn approval_flow_end_to_end() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);

        let item_id = post_item(&db, &ada, "Laptop");
        let claim =
            create_claim(&db, &bob, claim_req(item_id, "my initials are on the case")).unwrap();
        assert_eq!(claim.status, ClaimStatus::Pending);

        // the owner was notified
        let ada_inbox = db.notifications_for(&ada.id.to_string()).unwrap();
        assert_eq!(ada_inbox.len(), 1);
        assert!(ada_inbox[0].message.contains("Laptop"));

        let ruled = update_claim_status(
            &db,
            &ada,
            claim.id,
            decide(ClaimDecision::Approved, Some("Come to the physics block")),
        )
        .unwrap();
        assert_eq!(ruled.status, ClaimStatus::Approved);
        assert_eq!(ruled.owner_message.as_deref(), Some("Come to the physics block"));

        // the item is forced to claimed
        let item = get_item(&db, item_id).unwrap();
        assert_eq!(item.status, ItemStatus::Claimed);

        // the claimant was notified of the ruling
        let bob_inbox = db.notifications_for(&bob.id.to_string()).unwrap();
        assert_eq!(bob_inbox.len(), 1);
        assert!(bob_inbox[0].message.contains("approved"));
    }

    #[test]
    fn rejection_leaves_the_item_untouched() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);

        let item_id = post_item(&db, &ada, "Laptop");
        let claim = create_claim(&db, &bob, claim_req(item_id, "it is mine")).unwrap();

        update_claim_status(&db, &ada, claim.id, decide(ClaimDecision::Rejected, None)).unwrap();

        assert_eq!(get_item(&db, item_id).unwrap().status, ItemStatus::Active);
        let bob_inbox = db.notifications_for(&bob.id.to_string()).unwrap();
        assert!(bob_inbox[0].message.contains("rejected"));
    }

    #[test]
    fn claiming_your_own_item_is_rejected() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let item_id = post_item(&db, &ada, "Laptop");

        assert!(matches!(
            create_claim(&db, &ada, claim_req(item_id, "mine, obviously")),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn claim_on_missing_item_is_not_found() {
        let db = test_db();
        let bob = seed_user(&db, "Bob", "bob", Role::User);
        assert!(matches!(
            create_claim(&db, &bob, claim_req(Uuid::new_v4(), "it is mine")),
            Err(ApiError::NotFound("Item"))
        ));
    }

    #[test]
    fn only_the_item_owner_may_rule() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);
        let eve = seed_user(&db, "Eve", "eve", Role::User);

        let item_id = post_item(&db, &ada, "Laptop");
        let claim = create_claim(&db, &bob, claim_req(item_id, "it is mine")).unwrap();

        // neither the claimant nor a bystander may rule
        for actor in [&bob, &eve] {
            assert!(matches!(
                update_claim_status(&db, actor, claim.id, decide(ClaimDecision::Approved, None)),
                Err(ApiError::Unauthorized)
            ));
        }
    }

    #[test]
    fn ruling_on_a_claim_with_a_deleted_item_fails_cleanly() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);

        let item_id = post_item(&db, &ada, "Laptop");
        let claim = create_claim(&db, &bob, claim_req(item_id, "it is mine")).unwrap();

        db.delete_item(&item_id.to_string()).unwrap();

        assert!(matches!(
            update_claim_status(&db, &ada, claim.id, decide(ClaimDecision::Approved, None)),
            Err(ApiError::Integrity(_))
        ));
    }

    // Documents a known gap: a terminal claim can still be re-ruled by the
    // owner; the data layer has no guard and the last write wins.
    #[test]
    fn terminal_claim_can_still_be_re_ruled() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);

        let item_id = post_item(&db, &ada, "Laptop");
        let claim = create_claim(&db, &bob, claim_req(item_id, "it is mine")).unwrap();

        update_claim_status(&db, &ada, claim.id, decide(ClaimDecision::Approved, None)).unwrap();
        let re_ruled =
            update_claim_status(&db, &ada, claim.id, decide(ClaimDecision::Rejected, None))
                .unwrap();
        assert_eq!(re_ruled.status, ClaimStatus::Rejected);
    }

    #[test]
    fn incoming_lists_claims_against_my_items_only() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);
        let eve = seed_user(&db, "Eve", "eve", Role::User);

        let ada_item = post_item(&db, &ada, "Laptop");
        let bob_item = post_item(&db, &bob, "Umbrella");

        create_claim(&db, &eve, claim_req(ada_item, "stickers match mine")).unwrap();
        create_claim(&db, &eve, claim_req(bob_item, "left it on the bus")).unwrap();

        let incoming = list_incoming(&db, &ada).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].item.title, "Laptop");
        assert_eq!(incoming[0].claimant.username, "eve");
    }

    #[test]
    fn delete_is_admin_only_and_sends_no_notification() {
        let db = test_db();
        let ada = seed_user(&db, "Ada", "ada", Role::User);
        let bob = seed_user(&db, "Bob", "bob", Role::User);
        let moderator = seed_user(&db, "Mod", "moderator", Role::Admin);

        let item_id = post_item(&db, &ada, "Laptop");
        let claim = create_claim(&db, &bob, claim_req(item_id, "it is mine")).unwrap();

        assert!(matches!(
            delete_claim(&db, &bob, claim.id),
            Err(ApiError::Unauthorized)
        ));

        let bob_inbox_before = db.notifications_for(&bob.id.to_string()).unwrap().len();
        delete_claim(&db, &moderator, claim.id).unwrap();
        assert_eq!(
            db.notifications_for(&bob.id.to_string()).unwrap().len(),
            bob_inbox_before
        );

        assert!(matches!(
            delete_claim(&db, &moderator, claim.id),
            Err(ApiError::NotFound("Claim"))
        ));
    }
}

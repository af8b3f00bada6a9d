use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use reclaim_types::api::Claims;
use reclaim_types::models::{Principal, Role};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

/// Extract and validate the bearer token from the Authorization header, then
/// load the user's current role to build the `Principal` handed to every
/// protected handler. The role comes from the store on each request, so a
/// promotion takes effect without reissuing tokens.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    let sub = token_data.claims.sub;
    let db = state.clone();
    let user = blocking(move || db.db.user_by_id(&sub.to_string()).map_err(ApiError::from))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let role: Role = user
        .role
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt role on user {}: {}", user.id, e)))?;

    req.extensions_mut().insert(Principal { id: sub, role });
    Ok(next.run(req).await)
}

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use reclaim_db::Database;
use reclaim_types::api::{AuthResponse, Claims, LoginRequest, PublicUser, RegisterRequest, Success};
use reclaim_types::models::{Principal, Role};

use crate::blocking;
use crate::error::{ApiError, ApiResult};
use crate::parse_uuid;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user = blocking(move || register_user(&db.db, req)).await?;

    let token = create_token(&state.jwt_secret, user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(Success::new(AuthResponse { token, user })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user = blocking(move || login_user(&db.db, req)).await?;

    let token = create_token(&state.jwt_secret, user.id)?;

    Ok(Json(Success::new(AuthResponse { token, user })))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user = blocking(move || current_user(&db.db, &principal)).await?;
    Ok(Json(Success::new(user)))
}

/// Validates registration input, hashes the password with Argon2id and
/// inserts the user with role `user`.
pub fn register_user(db: &Database, req: RegisterRequest) -> ApiResult<PublicUser> {
    let name = req.name.trim();
    let username = req.username.trim();

    if name.is_empty() {
        return Err(ApiError::validation("Please provide your name"));
    }
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::validation("Username must be 3-32 characters"));
    }
    if req.password.len() < 6 {
        return Err(ApiError::validation("Password must be at least 6 characters"));
    }
    if db.user_by_username(username)?.is_some() {
        return Err(ApiError::validation("Username is already taken"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hash: {}", e)))?
        .to_string();

    let id = Uuid::new_v4();
    db.create_user(&id.to_string(), name, username, &password_hash, Role::User.as_str())?;

    Ok(PublicUser {
        id,
        name: name.to_string(),
        username: username.to_string(),
        role: Role::User,
    })
}

/// Verifies credentials. Unknown username and wrong password are
/// indistinguishable to the caller.
pub fn login_user(db: &Database, req: LoginRequest) -> ApiResult<PublicUser> {
    let user = db
        .user_by_username(req.username.trim())?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash on {}: {}", user.id, e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    public_user(db, &user.id)
}

pub fn current_user(db: &Database, principal: &Principal) -> ApiResult<PublicUser> {
    public_user(db, &principal.id.to_string())
}

/// Flips a user's role to admin. Exposed through the server's
/// `--promote-admin` flag rather than over HTTP.
pub fn promote_admin(db: &Database, username: &str) -> ApiResult<()> {
    if !db.set_user_role(username, Role::Admin.as_str())? {
        return Err(ApiError::NotFound("User"));
    }
    Ok(())
}

fn public_user(db: &Database, id: &str) -> ApiResult<PublicUser> {
    let user = db.user_by_id(id)?.ok_or(ApiError::NotFound("User"))?;
    Ok(PublicUser {
        id: parse_uuid(&user.id, "user"),
        name: user.name,
        username: user.username,
        role: crate::parse_stored(&user.role)?,
    })
}

fn create_token(secret: &str, user_id: Uuid) -> ApiResult<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token encode: {}", e)))?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_db;

    fn register_req(name: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn register_then_login_round_trips() {
        let db = test_db();
        let user = register_user(&db, register_req("Ada Lovelace", "ada", "hunter22")).unwrap();
        assert_eq!(user.role, Role::User);

        let logged_in = login_user(
            &db,
            LoginRequest {
                username: "ada".into(),
                password: "hunter22".into(),
            },
        )
        .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(logged_in.username, "ada");
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let db = test_db();
        register_user(&db, register_req("Ada", "ada", "hunter22")).unwrap();

        let wrong = login_user(
            &db,
            LoginRequest {
                username: "ada".into(),
                password: "nope".into(),
            },
        );
        let unknown = login_user(
            &db,
            LoginRequest {
                username: "ghost".into(),
                password: "hunter22".into(),
            },
        );
        assert!(matches!(wrong, Err(ApiError::Unauthorized)));
        assert!(matches!(unknown, Err(ApiError::Unauthorized)));
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = test_db();
        register_user(&db, register_req("Ada", "ada", "hunter22")).unwrap();
        let err = register_user(&db, register_req("Imposter", "ada", "hunter23"));
        assert!(matches!(err, Err(ApiError::Validation(_))));
    }

    #[test]
    fn short_password_is_rejected() {
        let db = test_db();
        let err = register_user(&db, register_req("Ada", "ada", "12345"));
        assert!(matches!(err, Err(ApiError::Validation(_))));
    }

    #[test]
    fn promote_admin_flips_role() {
        let db = test_db();
        let user = register_user(&db, register_req("Ada", "ada", "hunter22")).unwrap();
        promote_admin(&db, "ada").unwrap();

        let principal = Principal {
            id: user.id,
            role: Role::User,
        };
        let fresh = current_user(&db, &principal).unwrap();
        assert_eq!(fresh.role, Role::Admin);

        assert!(matches!(
            promote_admin(&db, "ghost"),
            Err(ApiError::NotFound("User"))
        ));
    }
}

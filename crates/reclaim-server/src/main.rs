use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use reclaim_api::auth::{self, AppState, AppStateInner};
use reclaim_api::middleware::require_auth;
use reclaim_api::{claims, items, messages, notifications};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reclaim=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("RECLAIM_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("RECLAIM_DB_PATH").unwrap_or_else(|_| "reclaim.db".into());
    let host = std::env::var("RECLAIM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RECLAIM_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = reclaim_db::Database::open(&PathBuf::from(&db_path))?;

    // One-shot maintenance mode: `reclaim --promote-admin <username>`
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("--promote-admin") {
        let username = args
            .get(2)
            .ok_or_else(|| anyhow::anyhow!("usage: reclaim --promote-admin <username>"))?;
        auth::promote_admin(&db, username)
            .map_err(|e| anyhow::anyhow!("promote '{}': {}", username, e))?;
        info!("User '{}' is now an admin", username);
        return Ok(());
    }

    // Shared state
    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/items", get(items::list))
        .route("/items/{id}", get(items::get))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/items", post(items::create))
        .route("/items/mine", get(items::mine))
        .route("/items/{id}", put(items::update).delete(items::delete))
        .route("/claims", post(claims::create).get(claims::incoming))
        .route("/claims/{id}", put(claims::update_status).delete(claims::delete))
        .route("/messages", post(messages::send))
        .route("/messages/threads", get(messages::threads))
        .route(
            "/messages/{item_id}/{other_user_id}",
            get(messages::conversation),
        )
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", put(notifications::mark_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Reclaim server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

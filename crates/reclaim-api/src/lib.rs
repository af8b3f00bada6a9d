pub mod auth;
pub mod claims;
pub mod error;
pub mod items;
pub mod messages;
pub mod middleware;
pub mod notifications;

pub use auth::{AppState, AppStateInner};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{error, warn};
use uuid::Uuid;

use error::ApiError;

/// Runs blocking storage work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })?
}

/// Stored ids are written by us, so a parse failure means a corrupt row;
/// log it and fall back rather than failing the whole response.
pub(crate) fn parse_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub(crate) fn parse_ts(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Tolerate SQLite's "YYYY-MM-DD HH:MM:SS" form as naive UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

/// Stored enum columns are constrained at write time; an unknown value is an
/// internal fault, not a client error.
pub(crate) fn parse_stored<T>(raw: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = reclaim_types::models::UnknownVariant>,
{
    raw.parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt stored value: {}", e)))
}

#[cfg(test)]
pub(crate) mod testutil {
    use reclaim_db::Database;
    use reclaim_types::models::{Principal, Role};
    use uuid::Uuid;

    pub fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn seed_user(db: &Database, name: &str, username: &str, role: Role) -> Principal {
        let id = Uuid::new_v4();
        db.create_user(&id.to_string(), name, username, "not-a-real-hash", role.as_str())
            .unwrap();
        Principal { id, role }
    }
}

//! Session middleware configuration.
//!
//! Sets up `SQLite`-backed sessions using tower-sessions. The cart lives
//! inside the session record.

use std::time::Duration;

use sqlx::SqlitePool;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bz_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// How often expired session rows are purged.
const EXPIRED_DELETION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Create the session store, creating its table if needed.
///
/// # Errors
///
/// Returns an error if the session table cannot be created.
pub async fn create_session_store(pool: &SqlitePool) -> Result<SqliteStore, sqlx::Error> {
    let store = SqliteStore::new(pool.clone());
    store.migrate().await?;
    Ok(store)
}

/// Spawn a background task deleting expired sessions.
pub fn spawn_expired_deletion(store: SqliteStore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = store
            .continuously_delete_expired(EXPIRED_DELETION_INTERVAL)
            .await
        {
            tracing::error!(error = %e, "expired session deletion stopped");
        }
    })
}

/// Create the session layer.
///
/// # Arguments
///
/// * `store` - Session store from [`create_session_store`]
/// * `config` - Storefront configuration (for the secure-cookie flag)
#[must_use]
pub fn create_session_layer(
    store: SqliteStore,
    config: &StorefrontConfig,
) -> SessionManagerLayer<SqliteStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

//! Database migration command.
//!
//! ```bash
//! bz-cli migrate
//! ```
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded in
//! both binaries; the storefront also applies them on startup.

use sqlx::SqlitePool;

use super::CommandError;

/// Apply pending storefront migrations.
pub async fn run(pool: &SqlitePool) -> Result<(), CommandError> {
    tracing::info!("Running storefront migrations...");
    bazaar_storefront::db::run_migrations(pool).await?;
    tracing::info!("Storefront migrations complete!");
    Ok(())
}

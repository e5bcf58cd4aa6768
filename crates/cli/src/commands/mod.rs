//! Command implementations.

pub mod category;
pub mod migrate;
pub mod user;

use bazaar_storefront::db::{self, RepositoryError};
use bazaar_storefront::services::AuthError;
use secrecy::SecretString;
use sqlx::SqlitePool;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://bazaar.db";

/// Errors a command can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("No account named {0}")]
    UnknownUser(String),

    #[error("Category name must not be blank")]
    BlankCategory,
}

/// Connect to the storefront database named by the environment.
pub async fn connect() -> Result<SqlitePool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BAZAAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}

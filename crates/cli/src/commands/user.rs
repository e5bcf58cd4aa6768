//! Account management commands.
//!
//! Admin accounts cannot be created through the signup page; this is where
//! they come from.

use bazaar_core::Role;
use bazaar_storefront::db::{RepositoryError, UserRepository};
use bazaar_storefront::services::AuthService;
use sqlx::SqlitePool;

use super::CommandError;

/// Create an account with any role.
pub async fn create(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<(), CommandError> {
    tracing::info!("Creating account: {} ({})", username, role);

    let user = AuthService::new(pool)
        .create_user(username, email, password, role)
        .await?;

    tracing::info!(
        "Account created successfully! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );
    Ok(())
}

/// Print every account, oldest first.
pub async fn list(pool: &SqlitePool) -> Result<(), CommandError> {
    let users = UserRepository::new(pool).list_all().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:<6} {:<20} {:<18} {:<32} created", "id", "username", "role", "email");
        for user in &users {
            println!(
                "{:<6} {:<20} {:<18} {:<32} {}",
                user.id,
                user.username,
                user.role,
                user.email,
                user.created_at.format("%Y-%m-%d")
            );
        }
    }
    Ok(())
}

/// Change an existing account's role.
pub async fn set_role(pool: &SqlitePool, username: &str, role: Role) -> Result<(), CommandError> {
    UserRepository::new(pool)
        .set_role(username, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CommandError::UnknownUser(username.to_owned()),
            other => other.into(),
        })?;

    tracing::info!("{} is now {}", username, role.label());
    Ok(())
}

//! Category management commands.

use bazaar_storefront::db::CategoryRepository;
use sqlx::SqlitePool;

use super::CommandError;

/// Add a category.
pub async fn add(pool: &SqlitePool, name: &str) -> Result<(), CommandError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::BlankCategory);
    }

    let category = CategoryRepository::new(pool).create(name).await?;
    tracing::info!("Category created: {} (ID: {})", category.name, category.id);
    Ok(())
}

/// Print every category.
pub async fn list(pool: &SqlitePool) -> Result<(), CommandError> {
    let categories = CategoryRepository::new(pool).list().await?;

    #[allow(clippy::print_stdout)]
    {
        for category in &categories {
            println!("{:<6} {}", category.id, category.name);
        }
    }
    Ok(())
}

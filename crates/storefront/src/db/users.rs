//! User repository for database operations.
//!
//! This module provides database access for accounts and their profiles.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use bazaar_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::{Profile, User};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for account queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            username: row.username,
            email,
            role: row.role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, role, created_at
            FROM user_account
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their password hash by username (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, PasswordRow>(
            r"
            SELECT id, username, email, role, created_at, password_hash
            FROM user_account
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create a new account with an empty profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
        role: Role,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO user_account (username, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, username, email, role, created_at
            ",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "username"))?;

        sqlx::query("INSERT INTO profile (user_id) VALUES (?)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Update a user's username and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new username is taken.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_identity(
        &self,
        id: UserId,
        username: &str,
        email: &Email,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE user_account SET username = ?, email = ? WHERE id = ?")
            .bind(username)
            .bind(email)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "username"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get a user's profile, empty if none has been saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_profile(&self, id: UserId) -> Result<Profile, RepositoryError> {
        let row: Option<(String, String, Option<String>)> =
            sqlx::query_as("SELECT address, phone, image FROM profile WHERE user_id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row
            .map(|(address, phone, image)| Profile {
                address,
                phone,
                image,
            })
            .unwrap_or_default())
    }

    /// Insert or replace a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_profile(&self, id: UserId, profile: &Profile) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO profile (user_id, address, phone, image)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                address = excluded.address,
                phone = excluded.phone,
                image = excluded.image
            ",
        )
        .bind(id)
        .bind(&profile.address)
        .bind(&profile.phone)
        .bind(&profile.image)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that username.
    pub async fn set_role(&self, username: &str, role: Role) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE user_account SET role = ? WHERE username = ?")
            .bind(role)
            .bind(username)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List all accounts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, role, created_at FROM user_account ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let pool = test_pool().await;
        let users = UserRepository::new(&pool);
        let email = Email::parse("ann@example.com").unwrap();

        let user = users
            .create("ann", &email, "hash", Role::InventoryManager)
            .await
            .unwrap();
        assert_eq!(user.role, Role::InventoryManager);

        let (found, hash) = users.get_password_hash("ANN").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "hash");

        assert_eq!(users.get_profile(user.id).await.unwrap(), Profile::default());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let pool = test_pool().await;
        let users = UserRepository::new(&pool);
        let email = Email::parse("bo@example.com").unwrap();

        users.create("bo", &email, "h", Role::Customer).await.unwrap();
        let err = users.create("Bo", &email, "h", Role::Customer).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_profile_upsert() {
        let pool = test_pool().await;
        let users = UserRepository::new(&pool);
        let email = Email::parse("cy@example.com").unwrap();
        let user = users.create("cy", &email, "h", Role::Customer).await.unwrap();

        let mut profile = Profile {
            address: "1 Main St".to_owned(),
            phone: "555-0100".to_owned(),
            image: Some("profile_images/cy.png".to_owned()),
        };
        users.upsert_profile(user.id, &profile).await.unwrap();
        assert_eq!(users.get_profile(user.id).await.unwrap(), profile);

        profile.image = None;
        users.upsert_profile(user.id, &profile).await.unwrap();
        assert_eq!(users.get_profile(user.id).await.unwrap().image, None);
    }
}

//! User domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, Role, UserId};

/// A storefront account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name, unique case-insensitively.
    pub username: String,
    /// Contact email.
    pub email: Email,
    /// The single role this account holds.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Contact details attached to a user.
///
/// Created lazily; a user without a stored profile has empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Free-form postal address.
    pub address: String,
    /// Phone number as entered.
    pub phone: String,
    /// Profile picture, relative to the media root.
    pub image: Option<String>,
}

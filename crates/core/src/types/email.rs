//! Account email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an email address was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is required")]
    Empty,
    #[error("email is longer than {} characters", Email::MAX_LENGTH)]
    TooLong,
    #[error("`{0}` is not an email address")]
    Malformed(String),
}

/// A trimmed email address of the form `local@domain.tld`.
///
/// The domain is stored lowercase; the local part is kept as typed.
///
/// ```
/// use bazaar_core::Email;
///
/// let email = Email::parse(" Ada@Example.ORG ").unwrap();
/// assert_eq!(email.as_str(), "Ada@example.org");
/// assert!(Email::parse("ada@localhost").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalize an address typed into a form.
    ///
    /// # Errors
    ///
    /// Returns an error for blank or over-long input, and for anything that
    /// is not one `@` between a non-empty local part and a dotted domain.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong);
        }

        let malformed = || EmailError::Malformed(trimmed.to_owned());
        if trimmed.chars().any(char::is_whitespace) {
            return Err(malformed());
        }
        let (local, domain) = trimmed.rsplit_once('@').ok_or_else(malformed)?;
        let labels_ok = domain.split('.').count() > 1 && domain.split('.').all(|l| !l.is_empty());
        if local.is_empty() || local.contains('@') || !labels_ok {
            return Err(malformed());
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(feature = "sqlite")]
impl sqlx::Type<sqlx::Sqlite> for Email {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

#[cfg(feature = "sqlite")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
    }
}

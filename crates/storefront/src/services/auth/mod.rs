//! Authentication service.
//!
//! Provides account registration and username/password login. Passwords are
//! hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::SqlitePool;

use bazaar_core::{Email, Role};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;
use crate::services::forms::FieldErrors;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum username length.
const MAX_USERNAME_LENGTH: usize = 150;

/// Raw signup form values.
#[derive(Debug, Clone, Copy)]
pub struct SignupInput<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password1: &'a str,
    pub password2: &'a str,
    pub role: &'a str,
}

/// A validated account registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: Email,
    pub password: String,
    pub role: Role,
}

impl Registration {
    /// Validate signup form values, collecting a message per failing field.
    ///
    /// Only self-service roles are accepted; admin accounts come from the CLI.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid.
    pub fn from_signup(input: SignupInput<'_>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = input.username.trim();
        if let Err(e) = validate_username(username) {
            errors.add("username", message(&e));
        }

        let email = Email::parse(input.email)
            .map_err(|e| errors.add("email", message(&AuthError::from(e))))
            .ok();

        if let Err(e) = validate_password(input.password1) {
            errors.add("password1", message(&e));
        }
        if input.password1 != input.password2 {
            errors.add("password2", message(&AuthError::PasswordMismatch));
        }

        let role = input
            .role
            .parse::<Role>()
            .ok()
            .filter(|r| Role::SELF_SERVICE.contains(r));
        if role.is_none() {
            errors.add("role", "Select a valid choice.");
        }

        match (email, role) {
            (Some(email), Some(role)) if errors.is_empty() => Ok(Self {
                username: username.to_owned(),
                email,
                password: input.password1.to_owned(),
                role,
            }),
            _ => Err(errors),
        }
    }
}

/// User-facing message for a validation error.
#[must_use]
pub fn message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidEmail(_) => "Enter a valid email address.".to_owned(),
        AuthError::InvalidUsername(msg) | AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::PasswordMismatch => "The two password fields didn't match.".to_owned(),
        AuthError::UserAlreadyExists => "A user with that username already exists.".to_owned(),
        AuthError::InvalidCredentials => {
            "Please enter a correct username and password.".to_owned()
        }
        AuthError::RoleNotAllowed(_) => "Select a valid choice.".to_owned(),
        AuthError::Repository(_) | AuthError::PasswordHash => "Something went wrong.".to_owned(),
    }
}

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register an account from a validated signup.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        if !Role::SELF_SERVICE.contains(&registration.role) {
            return Err(AuthError::RoleNotAllowed(registration.role));
        }
        self.insert(registration).await
    }

    /// Create an account with any role, validating every field.
    ///
    /// Used by the management CLI.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad username, email or password, and
    /// `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let username = username.trim();
        validate_username(username)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        self.insert(&Registration {
            username: username.to_owned(),
            email,
            password: password.to_owned(),
            role,
        })
        .await
    }

    async fn insert(&self, registration: &Registration) -> Result<User, AuthError> {
        let password_hash = hash_password(&registration.password)?;

        self.users
            .create(
                &registration.username,
                &registration.email,
                &password_hash,
                registration.role,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_password_hash(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Validate a username: 1-150 characters of letters, digits and `@.+-_`.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername` describing the problem.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::InvalidUsername(
            "This field is required.".to_owned(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "Ensure this value has at most {MAX_USERNAME_LENGTH} characters."
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AuthError::InvalidUsername(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_owned(),
        ));
    }
    Ok(())
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the problem.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "This password is entirely numeric.".to_owned(),
        ));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

//! Profile view and update.

use sqlx::SqlitePool;
use tracing::instrument;

use bazaar_core::{Email, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{Profile, User};
use crate::services::auth::{self, AuthError, validate_username};
use crate::services::catalog::{ImageUpload, check_image};
use crate::services::forms::FieldErrors;
use crate::services::media::{ImageFormat, MediaError, MediaStore};

/// Maximum address length in characters.
pub const MAX_ADDRESS_LENGTH: usize = 200;

/// Maximum phone number length in characters.
pub const MAX_PHONE_LENGTH: usize = 20;

/// Raw profile form values.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    /// The "remove picture" checkbox.
    pub clear_image: bool,
}

impl ProfileForm {
    /// Pre-fill from stored values.
    #[must_use]
    pub fn from_user(user: &User, profile: &Profile) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.to_string(),
            address: profile.address.clone(),
            phone: profile.phone.clone(),
            clear_image: false,
        }
    }
}

/// What to do with the stored profile picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace { format: ImageFormat, bytes: Vec<u8> },
}

/// A validated profile update.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: Email,
    pub address: String,
    pub phone: String,
    pub image: ImageChange,
}

impl ProfileUpdate {
    /// Validate every field of the profile form. A new picture wins over
    /// the remove checkbox.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid.
    pub fn validate(
        form: &ProfileForm,
        upload: Option<ImageUpload>,
        max_image_bytes: usize,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = form.username.trim();
        if let Err(e) = validate_username(username) {
            errors.add("username", auth::message(&e));
        }

        let email = Email::parse(&form.email)
            .map_err(|e| errors.add("email", auth::message(&AuthError::from(e))))
            .ok();

        let address = form.address.trim();
        let address_len = address.chars().count();
        if address_len > MAX_ADDRESS_LENGTH {
            errors.add(
                "address",
                format!("Ensure this value has at most {MAX_ADDRESS_LENGTH} characters (it has {address_len})."),
            );
        }

        let phone = form.phone.trim();
        if phone.chars().count() > MAX_PHONE_LENGTH {
            errors.add(
                "phone",
                format!("Ensure this value has at most {MAX_PHONE_LENGTH} characters."),
            );
        } else if !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
        {
            errors.add("phone", "Enter a valid phone number.");
        }

        let image = match upload {
            Some(upload) => match check_image(&upload, max_image_bytes) {
                Ok(format) => ImageChange::Replace {
                    format,
                    bytes: upload.bytes,
                },
                Err(msg) => {
                    errors.add("image", msg);
                    ImageChange::Keep
                }
            },
            None if form.clear_image => ImageChange::Clear,
            None => ImageChange::Keep,
        };

        match email {
            Some(email) if errors.is_empty() => Ok(Self {
                username: username.to_owned(),
                email,
                address: address.to_owned(),
                phone: phone.to_owned(),
                image,
            }),
            _ => Err(errors),
        }
    }
}

/// Outcome of saving a profile.
#[derive(Debug)]
pub enum ProfileSaveError {
    /// The new username belongs to someone else.
    UsernameTaken(FieldErrors),
    /// Storage failed.
    Repository(RepositoryError),
    /// The picture could not be written.
    Media(MediaError),
}

/// Save a validated profile update, storing a new picture under
/// `profile_images/` and deleting the one it replaces.
///
/// # Errors
///
/// Returns `ProfileSaveError::UsernameTaken` if the username is in use,
/// `ProfileSaveError::Media` if the picture cannot be written and
/// `ProfileSaveError::Repository` for other storage failures.
#[instrument(skip(pool, media, update), fields(user_id = %user_id))]
pub async fn save_profile(
    pool: &SqlitePool,
    media: &MediaStore,
    user_id: UserId,
    update: ProfileUpdate,
) -> Result<(), ProfileSaveError> {
    let users = UserRepository::new(pool);

    match users
        .update_identity(user_id, &update.username, &update.email)
        .await
    {
        Ok(()) => {}
        Err(RepositoryError::Conflict(_)) => {
            let mut errors = FieldErrors::new();
            errors.add("username", auth::message(&AuthError::UserAlreadyExists));
            return Err(ProfileSaveError::UsernameTaken(errors));
        }
        Err(e) => return Err(ProfileSaveError::Repository(e)),
    }

    let previous = users
        .get_profile(user_id)
        .await
        .map_err(ProfileSaveError::Repository)?
        .image;
    let (image, written) = match update.image {
        ImageChange::Keep => (previous.clone(), None),
        ImageChange::Clear => (None, None),
        ImageChange::Replace { format, bytes } => {
            let path = media
                .save_profile_image(format, &bytes)
                .await
                .map_err(ProfileSaveError::Media)?;
            (Some(path.clone()), Some(path))
        }
    };

    let profile = Profile {
        address: update.address,
        phone: update.phone,
        image,
    };
    if let Err(e) = users.upsert_profile(user_id, &profile).await {
        if let Some(path) = written {
            media.remove_all(&[path]).await;
        }
        return Err(ProfileSaveError::Repository(e));
    }

    if let Some(old) = previous.filter(|old| profile.image.as_ref() != Some(old)) {
        media.remove_all(&[old]).await;
    }

    tracing::info!(has_image = profile.image.is_some(), "profile updated");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::Role;

    use super::*;
    use crate::db::test_pool;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn form(username: &str, email: &str, phone: &str) -> ProfileForm {
        ProfileForm {
            username: username.to_owned(),
            email: email.to_owned(),
            address: "1 Main St".to_owned(),
            phone: phone.to_owned(),
            clear_image: false,
        }
    }

    fn upload(bytes: &[u8]) -> Option<ImageUpload> {
        Some(ImageUpload {
            file_name: "me.png".to_owned(),
            bytes: bytes.to_vec(),
        })
    }

    #[test]
    fn test_validate_ok() {
        let update =
            ProfileUpdate::validate(&form(" ada ", "ada@example.com", "+1 555-0100"), None, 1024)
                .unwrap();
        assert_eq!(update.username, "ada");
        assert_eq!(update.phone, "+1 555-0100");
        assert_eq!(update.image, ImageChange::Keep);
    }

    #[test]
    fn test_validate_collects_errors() {
        let errors =
            ProfileUpdate::validate(&form("bad name", "nope", "call me"), upload(b"%PDF-1.7"), 1024)
                .unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(errors.has("phone"));
        assert!(errors.has("image"));
    }

    #[test]
    fn test_validate_image_choice() {
        let mut clearing = form("ada", "ada@example.com", "");
        clearing.clear_image = true;
        let update = ProfileUpdate::validate(&clearing, None, 1024).unwrap();
        assert_eq!(update.image, ImageChange::Clear);

        let update = ProfileUpdate::validate(&clearing, upload(PNG), 1024).unwrap();
        assert!(matches!(
            update.image,
            ImageChange::Replace {
                format: ImageFormat::Png,
                ..
            }
        ));

        let errors = ProfileUpdate::validate(&clearing, upload(PNG), 4).unwrap_err();
        assert!(errors.get("image").unwrap().contains("KB limit"));
    }

    #[tokio::test]
    async fn test_save_profile_and_conflict() {
        let pool = test_pool().await;
        let users = UserRepository::new(&pool);
        let email = Email::parse("a@example.com").unwrap();
        let ada = users.create("ada", &email, "h", Role::Customer).await.unwrap();
        users.create("bob", &email, "h", Role::Customer).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());

        let update =
            ProfileUpdate::validate(&form("ada2", "ada@example.com", "555"), None, 1024).unwrap();
        save_profile(&pool, &media, ada.id, update).await.unwrap();

        let stored = users.get_by_id(ada.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "ada2");
        assert_eq!(users.get_profile(ada.id).await.unwrap().phone, "555");

        let taken = ProfileUpdate::validate(&form("bob", "ada@example.com", ""), None, 1024).unwrap();
        assert!(matches!(
            save_profile(&pool, &media, ada.id, taken).await,
            Err(ProfileSaveError::UsernameTaken(_))
        ));
    }

    #[tokio::test]
    async fn test_save_profile_replaces_and_clears_picture() {
        let pool = test_pool().await;
        let users = UserRepository::new(&pool);
        let email = Email::parse("cy@example.com").unwrap();
        let cy = users.create("cy", &email, "h", Role::Customer).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());

        let first = ProfileUpdate::validate(&form("cy", "cy@example.com", ""), upload(PNG), 1024).unwrap();
        save_profile(&pool, &media, cy.id, first).await.unwrap();
        let first_path = users.get_profile(cy.id).await.unwrap().image.unwrap();
        assert!(first_path.starts_with("profile_images/"));
        assert!(dir.path().join(&first_path).is_file());

        // Saving without a file keeps the picture
        let keep = ProfileUpdate::validate(&form("cy", "cy@example.com", "1"), None, 1024).unwrap();
        save_profile(&pool, &media, cy.id, keep).await.unwrap();
        assert_eq!(users.get_profile(cy.id).await.unwrap().image.as_deref(), Some(first_path.as_str()));

        let second = ProfileUpdate::validate(&form("cy", "cy@example.com", ""), upload(PNG), 1024).unwrap();
        save_profile(&pool, &media, cy.id, second).await.unwrap();
        let second_path = users.get_profile(cy.id).await.unwrap().image.unwrap();
        assert_ne!(second_path, first_path);
        assert!(!dir.path().join(&first_path).exists());

        let mut clearing = form("cy", "cy@example.com", "");
        clearing.clear_image = true;
        let clear = ProfileUpdate::validate(&clearing, None, 1024).unwrap();
        save_profile(&pool, &media, cy.id, clear).await.unwrap();
        assert_eq!(users.get_profile(cy.id).await.unwrap().image, None);
        assert!(!dir.path().join(&second_path).exists());
    }
}

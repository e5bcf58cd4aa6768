//! Item form validation and catalog mutations.
//!
//! Validation collects every field error before touching storage. Image files
//! are written only once the whole form is valid, and removed again if the
//! database insert fails.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{CategoryId, ItemId, Money, MoneyError, UserId};

use crate::db::{CategoryRepository, ItemRepository, RepositoryError};
use crate::models::{CurrentUser, Item, NewItem, UpdateItem};
use crate::services::forms::{FieldErrors, non_blank};
use crate::services::media::{ImageFormat, MediaError, MediaStore};

/// Maximum images per item.
pub const MAX_IMAGES: usize = 3;

/// Maximum item name length in characters.
pub const MAX_NAME_LENGTH: usize = 255;

const REQUIRED: &str = "This field is required.";

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The submitted form has field errors.
    #[error("invalid item form")]
    Invalid(FieldErrors),

    /// Database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Image storage error.
    #[error("media error: {0}")]
    Media(#[from] MediaError),
}

/// Raw item form values.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ItemFormInput {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub stock: String,
}

impl ItemFormInput {
    /// Pre-fill values from an existing item.
    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        Self {
            category: item.category_id.to_string(),
            name: item.name.clone(),
            description: item.description.clone().unwrap_or_default(),
            price: item.price.plain(),
            stock: item.stock.to_string(),
        }
    }
}

/// One uploaded file from the item form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-supplied file name (for messages only).
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Validated item fields shared by create and edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
}

impl ItemFields {
    /// Validate name, description, price and stock.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid.
    pub fn validate(input: &ItemFormInput) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let fields = Self::collect(input, &mut errors);
        match fields {
            Some(fields) if errors.is_empty() => Ok(fields),
            _ => Err(errors),
        }
    }

    fn collect(input: &ItemFormInput, errors: &mut FieldErrors) -> Option<Self> {
        let name = input.name.trim();
        let name_len = name.chars().count();
        if name.is_empty() {
            errors.add("name", REQUIRED);
        } else if name_len > MAX_NAME_LENGTH {
            errors.add(
                "name",
                format!("Ensure this value has at most {MAX_NAME_LENGTH} characters (it has {name_len})."),
            );
        }

        let price = Money::parse(&input.price)
            .map_err(|e| errors.add("price", price_message(&e)))
            .ok();
        let stock = parse_stock(&input.stock)
            .map_err(|msg| errors.add("stock", msg))
            .ok();

        Some(Self {
            name: name.to_owned(),
            description: non_blank(&input.description),
            price: price?,
            stock: stock?,
        })
    }
}

fn price_message(err: &MoneyError) -> String {
    match err {
        MoneyError::Empty => REQUIRED.to_owned(),
        MoneyError::Invalid => "Enter a number.".to_owned(),
        MoneyError::Negative => "Ensure this value is greater than or equal to 0.".to_owned(),
        MoneyError::TooPrecise => "Ensure that there are no more than 2 decimal places.".to_owned(),
        MoneyError::Overflow => "Ensure this value is less than or equal to 92233720368547758.07.".to_owned(),
    }
}

fn parse_stock(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(REQUIRED.to_owned());
    }
    let n: i64 = raw.parse().map_err(|_| "Enter a whole number.".to_owned())?;
    if n < 0 {
        return Err("Ensure this value is greater than or equal to 0.".to_owned());
    }
    u32::try_from(n).map_err(|_| format!("Ensure this value is less than or equal to {}.", u32::MAX))
}

/// Check uploads: at most three, each a supported image within `max_bytes`.
///
/// # Errors
///
/// Returns the `images` field errors.
pub fn validate_images(
    uploads: &[ImageUpload],
    max_bytes: usize,
) -> Result<Vec<ImageFormat>, FieldErrors> {
    let mut errors = FieldErrors::new();

    if uploads.len() > MAX_IMAGES {
        errors.add("images", format!("You can upload at most {MAX_IMAGES} images."));
    }

    let mut formats = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match check_image(upload, max_bytes) {
            Ok(format) => formats.push(format),
            Err(msg) => errors.add("images", msg),
        }
    }

    errors.into_result(formats)
}

/// Check one upload is a supported image no larger than `max_bytes`.
///
/// # Errors
///
/// Returns the message to show next to the file input.
pub fn check_image(upload: &ImageUpload, max_bytes: usize) -> Result<ImageFormat, String> {
    if upload.bytes.len() > max_bytes {
        return Err(format!(
            "{} is larger than the {} KB limit.",
            upload.file_name,
            max_bytes / 1024
        ));
    }
    ImageFormat::sniff(&upload.bytes).ok_or_else(|| {
        format!(
            "Upload a valid image. {} was either not an image or a corrupted image.",
            upload.file_name
        )
    })
}

/// Whether `user` may edit or delete `item`.
///
/// Inventory managers may change only their own items; admins may change any.
#[must_use]
pub fn can_modify(user: &CurrentUser, item: &Item) -> bool {
    user.role.can_manage_any_item() || (user.role.is_staff() && item.created_by == user.id)
}

/// Catalog mutations.
pub struct CatalogService<'a> {
    pool: &'a SqlitePool,
    media: &'a MediaStore,
    max_upload_bytes: usize,
}

impl<'a> CatalogService<'a> {
    /// Create a catalog service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, media: &'a MediaStore, max_upload_bytes: usize) -> Self {
        Self {
            pool,
            media,
            max_upload_bytes,
        }
    }

    /// Validate and insert a new item with its images.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` with every field error if the form is
    /// invalid; nothing is persisted in that case.
    #[instrument(skip(self, input, uploads), fields(owner = %owner, images = uploads.len()))]
    pub async fn create(
        &self,
        input: &ItemFormInput,
        uploads: &[ImageUpload],
        owner: UserId,
    ) -> Result<ItemId, CatalogError> {
        let mut errors = FieldErrors::new();

        let category = match input.category.trim().parse::<i64>() {
            Ok(id) => CategoryRepository::new(self.pool).get(CategoryId::new(id)).await?,
            Err(_) => None,
        };
        if category.is_none() {
            let message = if input.category.trim().is_empty() {
                REQUIRED
            } else {
                "Select a valid choice. That choice is not one of the available choices."
            };
            errors.add("category", message);
        }

        let fields = ItemFields::collect(input, &mut errors);
        let formats = validate_images(uploads, self.max_upload_bytes).unwrap_or_else(|image_errors| {
            if let Some(msg) = image_errors.get("images") {
                errors.add("images", msg);
            }
            Vec::new()
        });

        let (Some(category), Some(fields)) = (category, fields) else {
            return Err(CatalogError::Invalid(errors));
        };
        if !errors.is_empty() {
            return Err(CatalogError::Invalid(errors));
        }

        let mut paths = Vec::with_capacity(formats.len());
        for (format, upload) in formats.iter().zip(uploads) {
            match self.media.save_item_image(*format, &upload.bytes).await {
                Ok(path) => paths.push(path),
                Err(e) => {
                    self.media.remove_all(&paths).await;
                    return Err(e.into());
                }
            }
        }

        let new = NewItem {
            category_id: category.id,
            name: fields.name,
            description: fields.description,
            price: fields.price,
            stock: fields.stock,
            created_by: owner,
        };

        match ItemRepository::new(self.pool).create(&new, &paths).await {
            Ok(id) => {
                tracing::info!(item_id = %id, "item created");
                Ok(id)
            }
            Err(e) => {
                self.media.remove_all(&paths).await;
                Err(e.into())
            }
        }
    }

    /// Validate and apply an edit to an existing item.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the form is invalid.
    #[instrument(skip(self, item, input), fields(item_id = %item.id))]
    pub async fn update(&self, item: &Item, input: &ItemFormInput) -> Result<(), CatalogError> {
        let fields = ItemFields::validate(input).map_err(CatalogError::Invalid)?;
        let update = UpdateItem {
            name: fields.name,
            description: fields.description,
            price: fields.price,
            stock: fields.stock,
        };

        ItemRepository::new(self.pool).update(item.id, &update).await?;
        tracing::info!("item updated");
        Ok(())
    }

    /// Delete an item, its image rows and image files.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the delete fails.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn delete(&self, item: &Item) -> Result<(), CatalogError> {
        let paths = ItemRepository::new(self.pool).delete(item.id).await?;
        self.media.remove_all(&paths).await;
        tracing::info!(files = paths.len(), "item deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Email, Role};

    use super::*;
    use crate::db::{UserRepository, test_pool};

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];

    fn input(category: &str, name: &str, price: &str, stock: &str) -> ItemFormInput {
        ItemFormInput {
            category: category.to_owned(),
            name: name.to_owned(),
            description: String::new(),
            price: price.to_owned(),
            stock: stock.to_owned(),
        }
    }

    fn jpeg(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.to_owned(),
            bytes: JPEG.to_vec(),
        }
    }

    #[test]
    fn test_fields_valid() {
        let fields = ItemFields::validate(&input("", " Lamp ", "12.5", "3")).unwrap();
        assert_eq!(fields.name, "Lamp");
        assert_eq!(fields.price, Money::from_cents(1250));
        assert_eq!(fields.stock, 3);
        assert_eq!(fields.description, None);
    }

    #[test]
    fn test_fields_collect_every_error() {
        let errors = ItemFields::validate(&input("", "", "1.234", "-1")).unwrap_err();
        assert_eq!(errors.get("name"), Some(REQUIRED));
        assert!(errors.get("price").unwrap().contains("2 decimal places"));
        assert!(errors.get("stock").unwrap().contains("greater than or equal to 0"));
    }

    #[test]
    fn test_name_too_long() {
        let errors = ItemFields::validate(&input("", &"x".repeat(256), "1", "1")).unwrap_err();
        assert!(errors.has("name"));
        assert!(ItemFields::validate(&input("", &"x".repeat(255), "1", "1")).is_ok());
    }

    #[test]
    fn test_validate_images() {
        let ok = validate_images(&[jpeg("a.jpg"), jpeg("b.jpg")], 1024).unwrap();
        assert_eq!(ok, vec![ImageFormat::Jpeg, ImageFormat::Jpeg]);

        let four = vec![jpeg("a"), jpeg("b"), jpeg("c"), jpeg("d")];
        assert!(validate_images(&four, 1024).is_err());

        assert!(validate_images(&[jpeg("big.jpg")], 2).is_err());

        let text = ImageUpload {
            file_name: "notes.txt".to_owned(),
            bytes: b"hello".to_vec(),
        };
        assert!(validate_images(&[text], 1024).unwrap_err().get("images").unwrap().contains("notes.txt"));
    }

    #[tokio::test]
    async fn test_create_writes_images_and_delete_removes_them() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let owner = UserRepository::new(&pool)
            .create("im", &Email::parse("im@example.com").unwrap(), "h", Role::InventoryManager)
            .await
            .unwrap();
        let category = CategoryRepository::new(&pool).create("Lighting").await.unwrap();
        let catalog = CatalogService::new(&pool, &media, 1024);

        let id = catalog
            .create(
                &input(&category.id.to_string(), "Lamp", "20", "2"),
                &[jpeg("a.jpg"), jpeg("b.jpg")],
                owner.id,
            )
            .await
            .unwrap();

        let repo = ItemRepository::new(&pool);
        let images = repo.images(id).await.unwrap();
        assert_eq!(images.len(), 2);
        for image in &images {
            assert!(dir.path().join(&image.path).exists());
        }

        let item = repo.get(id).await.unwrap().unwrap();
        catalog.delete(&item).await.unwrap();
        for image in &images {
            assert!(!dir.path().join(&image.path).exists());
        }
    }

    #[tokio::test]
    async fn test_create_invalid_persists_nothing() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let owner = UserRepository::new(&pool)
            .create("im", &Email::parse("im@example.com").unwrap(), "h", Role::InventoryManager)
            .await
            .unwrap();
        let catalog = CatalogService::new(&pool, &media, 1024);

        let err = catalog
            .create(&input("999", "Lamp", "20", "2"), &[jpeg("a.jpg")], owner.id)
            .await
            .unwrap_err();
        let CatalogError::Invalid(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.has("category"));
        assert!(!dir.path().join("item_images").exists());
        assert!(ItemRepository::new(&pool).list_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_can_modify() {
        let item = Item {
            id: ItemId::new(1),
            category_id: CategoryId::new(1),
            category_name: "C".to_owned(),
            name: "N".to_owned(),
            description: None,
            price: Money::ZERO,
            stock: 1,
            created_by: UserId::new(7),
            created_by_username: "owner".to_owned(),
            created_at: chrono::Utc::now(),
        };
        let user = |id, role| CurrentUser {
            id: UserId::new(id),
            username: "u".to_owned(),
            role,
        };

        assert!(can_modify(&user(7, Role::InventoryManager), &item));
        assert!(!can_modify(&user(8, Role::InventoryManager), &item));
        assert!(can_modify(&user(8, Role::Admin), &item));
        assert!(!can_modify(&user(7, Role::Customer), &item));
    }
}

//! Storage of uploaded images.
//!
//! Item images live under `<media_dir>/item_images/` and profile pictures
//! under `<media_dir>/profile_images/`, both with random names. The
//! database stores the path relative to the media directory, and the files
//! are served from `/media`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Subdirectory of the media root for item images.
const ITEM_IMAGES_DIR: &str = "item_images";

const PROFILE_IMAGES_DIR: &str = "profile_images";

/// Errors from media storage.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Filesystem operation failed.
    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored path points outside the media directory.
    #[error("invalid media path: {0}")]
    InvalidPath(String),
}

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Detect the format from the file's leading bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::WebP),
            _ => None,
        }
    }

    /// File extension used when storing.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}

/// Writes and deletes uploaded images under a root directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The media root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an image, returning its path relative to the media root.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory or file cannot be written.
    pub async fn save_item_image(
        &self,
        format: ImageFormat,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        self.save_in(ITEM_IMAGES_DIR, format, bytes).await
    }

    /// Write a profile picture, returning its path relative to the media root.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory or file cannot be written.
    pub async fn save_profile_image(
        &self,
        format: ImageFormat,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        self.save_in(PROFILE_IMAGES_DIR, format, bytes).await
    }

    async fn save_in(
        &self,
        subdir: &str,
        format: ImageFormat,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), format.extension());
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        Ok(format!("{subdir}/{file_name}"))
    }

    /// Delete a stored file. Missing files are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::InvalidPath` for paths escaping the media root
    /// and `MediaError::Io` if deletion fails.
    pub async fn remove(&self, relative: &str) -> Result<(), MediaError> {
        let path = Path::new(relative);
        if !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(MediaError::InvalidPath(relative.to_owned()));
        }

        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete several files, logging rather than failing on errors.
    pub async fn remove_all(&self, relatives: &[String]) {
        for relative in relatives {
            if let Err(e) = self.remove(relative).await {
                tracing::warn!(path = %relative, error = %e, "failed to delete media file");
            }
        }
    }
}

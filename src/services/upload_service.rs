//! Image upload validation.
//!
//! Accepted images are JPEG, PNG and WebP. The declared `Content-Type` must agree with
//! the file's leading magic bytes; the bytes are stored untouched.

use uuid::Uuid;

use crate::{error::AppError, storage::ObjectStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// Parse a `Content-Type` value, ignoring parameters such as `; charset=`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
        }
    }

    pub fn matches_magic(&self, bytes: &[u8]) -> bool {
        match self {
            ImageKind::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            ImageKind::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            ImageKind::Webp => {
                bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP"
            }
        }
    }
}

/// Check an upload and work out its kind.
///
/// # Errors
///
/// - `UnsupportedMediaType`: missing or non-image content type
/// - `InvalidRequest`: empty body, or bytes that are not the declared type
/// - `PayloadTooLarge`: more than `max_bytes`
pub fn validate_image(
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<ImageKind, AppError> {
    let declared = content_type.unwrap_or("");
    let kind = ImageKind::from_content_type(declared)
        .ok_or_else(|| AppError::UnsupportedMediaType(declared.to_string()))?;

    if bytes.is_empty() {
        return Err(AppError::InvalidRequest("Upload body is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(max_bytes));
    }
    if !kind.matches_magic(bytes) {
        return Err(AppError::InvalidRequest(format!(
            "File content is not a valid {}",
            kind.mime()
        )));
    }

    Ok(kind)
}

/// Stored upload.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredUpload {
    pub success: bool,
    pub key: String,
    pub url: String,
}

/// Validate and store an image under `<owner>/<uuid>.<ext>`.
pub async fn store_image(
    storage: &dyn ObjectStorage,
    owner: Uuid,
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<StoredUpload, AppError> {
    let kind = validate_image(content_type, bytes, max_bytes)?;
    let key = format!("{owner}/{}.{}", Uuid::new_v4(), kind.extension());

    storage.put(&key, bytes, kind.mime()).await?;

    tracing::info!(user_id = %owner, key = %key, size = bytes.len(), "image uploaded");

    Ok(StoredUpload {
        success: true,
        url: storage.public_url(&key),
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalDiskStorage;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    const WEBP: &[u8] = b"RIFF\x24\0\0\0WEBPVP8 ";

    #[test]
    fn content_types_are_recognized() {
        assert_eq!(ImageKind::from_content_type("image/png"), Some(ImageKind::Png));
        assert_eq!(
            ImageKind::from_content_type("Image/JPEG; charset=binary"),
            Some(ImageKind::Jpeg)
        );
        assert_eq!(ImageKind::from_content_type("image/gif"), None);
        assert_eq!(ImageKind::from_content_type("application/pdf"), None);
    }

    #[test]
    fn magic_bytes_must_match_declared_type() {
        assert_eq!(validate_image(Some("image/png"), PNG, 1024).unwrap(), ImageKind::Png);
        assert_eq!(validate_image(Some("image/jpeg"), JPEG, 1024).unwrap(), ImageKind::Jpeg);
        assert_eq!(validate_image(Some("image/webp"), WEBP, 1024).unwrap(), ImageKind::Webp);

        assert!(matches!(
            validate_image(Some("image/png"), JPEG, 1024),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_image(Some("image/webp"), b"RIFF\0\0\0\0WAVE", 1024),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn size_and_type_limits() {
        assert!(matches!(
            validate_image(Some("image/png"), PNG, 4),
            Err(AppError::PayloadTooLarge(4))
        ));
        assert!(matches!(
            validate_image(Some("text/plain"), PNG, 1024),
            Err(AppError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            validate_image(None, PNG, 1024),
            Err(AppError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            validate_image(Some("image/png"), b"", 1024),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn stored_key_is_owner_scoped() {
        let root = std::env::temp_dir().join(format!("alga-upload-{}", Uuid::new_v4()));
        let storage = LocalDiskStorage::new(&root, "http://localhost:3000/uploads");
        let owner = Uuid::new_v4();

        let upload = store_image(&storage, owner, Some("image/png"), PNG, 1024)
            .await
            .unwrap();

        assert!(upload.key.starts_with(&format!("{owner}/")));
        assert!(upload.key.ends_with(".png"));
        assert_eq!(upload.url, format!("http://localhost:3000/uploads/{}", upload.key));
        assert!(storage.exists(&upload.key).await.unwrap());

        tokio::fs::remove_dir_all(root).await.unwrap();
    }
}

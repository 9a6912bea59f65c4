//! Object storage for uploaded images.
//!
//! Keys are relative paths (`<user_id>/<uuid>.<ext>`). [`LocalDiskStorage`] writes
//! them under a root directory that the router also serves at `/uploads`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Public URL clients use to fetch `key`.
    fn public_url(&self, key: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolve `key` under the root, refusing absolute paths and `..`.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalDiskStorage {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, content_type, size = bytes.len(), "object stored");
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(path).await?)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("alga-storage-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn put_then_exists() {
        let root = temp_root();
        let storage = LocalDiskStorage::new(&root, "http://localhost:3000/uploads/");

        storage.put("user-1/a.png", b"\x89PNG", "image/png").await.unwrap();

        assert!(storage.exists("user-1/a.png").await.unwrap());
        assert!(!storage.exists("user-1/b.png").await.unwrap());
        assert_eq!(
            storage.public_url("user-1/a.png"),
            "http://localhost:3000/uploads/user-1/a.png"
        );

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let storage = LocalDiskStorage::new(temp_root(), "http://x");

        for key in ["../etc/passwd", "/abs/path", "a/../../b", ""] {
            assert!(
                matches!(storage.put(key, b"x", "image/png").await, Err(StorageError::InvalidKey(_))),
                "{key} should be rejected"
            );
        }
    }
}

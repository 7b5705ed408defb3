//! Durable Object Storage
//!
//! Generated images are re-uploaded here because provider URLs expire.
//! Objects are addressed by bucket and key; the key layout used by callers
//! is `{user_id}/{filename}`.
//!
//! [`LocalObjectStore`] writes under `{root}/{bucket}/{key}` and hands out
//! `{public_url}/storage/{bucket}/{key}`, which the server serves as static
//! files.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Bucket holding files attached to canvases
pub const CANVAS_FILES_BUCKET: &str = "canvas-files";

/// URL prefix under which stored objects are served
pub const STORAGE_ROUTE_PREFIX: &str = "/storage";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Failed to write object {key}: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` and return the public URL of the object
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<String, StorageError>;
}

/// Object store backed by a local directory
pub struct LocalObjectStore {
    root: PathBuf,
    public_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an object on disk. Rejects keys that would escape the bucket.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let safe = |s: &str| {
            !s.is_empty()
                && Path::new(s)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
        };
        if !safe(bucket) || !safe(key) {
            return Err(StorageError::InvalidKey(format!("{}/{}", bucket, key)));
        }
        Ok(self.root.join(bucket).join(key))
    }

    pub fn public_url_for(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}{}/{}/{}",
            self.public_url, STORAGE_ROUTE_PREFIX, bucket, key
        )
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let path = self.object_path(bucket, key)?;
        let write_err = |source: std::io::Error| StorageError::WriteFailed {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(write_err)?;

        debug!(bucket, key, size = bytes.len(), content_type = ?content_type, "object stored");
        Ok(self.public_url_for(bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_writes_file_and_returns_public_url() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = LocalObjectStore::new(temp_dir.path(), "http://localhost:3000/");

        let url = store
            .put(CANVAS_FILES_BUCKET, "u1/img.png", b"png-bytes", Some("image/png"))
            .await?;

        assert_eq!(url, "http://localhost:3000/storage/canvas-files/u1/img.png");
        let written = std::fs::read(temp_dir.path().join("canvas-files/u1/img.png"))?;
        assert_eq!(written, b"png-bytes");
        Ok(())
    }

    #[tokio::test]
    async fn test_traversal_keys_rejected() {
        let store = LocalObjectStore::new("/tmp/unused", "http://localhost");
        for key in ["../etc/passwd", "/abs/path", "u1/../../x", ""] {
            let result = store.put(CANVAS_FILES_BUCKET, key, b"x", None).await;
            assert!(matches!(result, Err(StorageError::InvalidKey(_))), "{}", key);
        }
    }
}

//! Local filesystem blob storage provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use strata_core::error::{AppError, ErrorKind};
use strata_core::result::AppResult;
use strata_core::traits::storage::BlobStorage;

use super::shard_path;

/// Blob storage on the local filesystem.
///
/// Payloads live under a sharded content-addressed tree rooted at a
/// configured directory; the checksum alone determines the path, so
/// writes are naturally idempotent.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    /// Root directory for all stored payloads.
    root: PathBuf,
}

impl LocalBlobStorage {
    /// Create a new local blob store rooted at the given path.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create blob root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Resolve a checksum to its absolute path within the root.
    fn resolve(&self, checksum: &str) -> AppResult<(String, PathBuf)> {
        let relative = shard_path(checksum)?;
        let full = self.root.join(&relative);
        Ok((relative, full))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create shard directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn write(&self, checksum: &str, data: Bytes) -> AppResult<String> {
        let (relative, full) = self.resolve(checksum)?;

        if fs::try_exists(&full).await.unwrap_or(false) {
            debug!(checksum, "Blob already present, skipping write");
            return Ok(relative);
        }

        self.ensure_parent(&full).await?;
        fs::write(&full, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write blob {checksum}"),
                e,
            )
        })?;

        debug!(checksum, bytes = data.len(), "Wrote blob");
        Ok(relative)
    }

    async fn read(&self, checksum: &str) -> AppResult<Bytes> {
        let (_, full) = self.resolve(checksum)?;
        let data = fs::read(&full).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {checksum}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read blob {checksum}"),
                    e,
                )
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, checksum: &str) -> AppResult<()> {
        let (_, full) = self.resolve(checksum)?;
        match fs::remove_file(&full).await {
            Ok(()) => {
                debug!(checksum, "Deleted blob");
                Ok(())
            }
            // A concurrent sweep may already have reclaimed it.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob {checksum}"),
                e,
            )),
        }
    }

    async fn exists(&self, checksum: &str) -> AppResult<bool> {
        let (_, full) = self.resolve(checksum)?;
        fs::try_exists(&full).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to stat blob {checksum}"),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256_hex;

    async fn make_store() -> (tempfile::TempDir, LocalBlobStorage) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStorage::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let (_dir, store) = make_store().await;
        let content = Bytes::from_static(b"payload");
        let checksum = sha256_hex(&content);

        let path = store.write(&checksum, content.clone()).await.unwrap();
        assert!(path.ends_with(&checksum));
        assert!(store.exists(&checksum).await.unwrap());
        assert_eq!(store.read(&checksum).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let (_dir, store) = make_store().await;
        let content = Bytes::from_static(b"payload");
        let checksum = sha256_hex(&content);

        let first = store.write(&checksum, content.clone()).await.unwrap();
        let second = store.write(&checksum, content).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing() {
        let (_dir, store) = make_store().await;
        let checksum = sha256_hex(b"never written");
        store.delete(&checksum).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_dir, store) = make_store().await;
        let err = store.read(&sha256_hex(b"missing")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}

//! In-memory blob storage using a Tokio mutex, for single-node tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use strata_core::error::AppError;
use strata_core::result::AppResult;
use strata_core::traits::storage::BlobStorage;

use super::shard_path;

/// In-memory blob storage keyed by checksum.
///
/// Mirrors the local provider's path reporting so callers observe the same
/// `storage_path` values either way.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStorage {
    /// Stored payloads by checksum.
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryBlobStorage {
    /// Create an empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payloads.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Whether the store holds no payloads.
    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn write(&self, checksum: &str, data: Bytes) -> AppResult<String> {
        let relative = shard_path(checksum)?;
        self.objects
            .lock()
            .await
            .entry(checksum.to_string())
            .or_insert(data);
        Ok(relative)
    }

    async fn read(&self, checksum: &str) -> AppResult<Bytes> {
        shard_path(checksum)?;
        self.objects
            .lock()
            .await
            .get(checksum)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {checksum}")))
    }

    async fn delete(&self, checksum: &str) -> AppResult<()> {
        shard_path(checksum)?;
        self.objects.lock().await.remove(checksum);
        Ok(())
    }

    async fn exists(&self, checksum: &str) -> AppResult<bool> {
        shard_path(checksum)?;
        Ok(self.objects.lock().await.contains_key(checksum))
    }
}

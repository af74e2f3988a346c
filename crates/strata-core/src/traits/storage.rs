//! Physical blob storage trait for content-addressed payloads.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for physical payload storage keyed by content checksum.
///
/// Implementations exist for the local filesystem and for memory
/// (single-node deployments and tests). The trait is defined here in
/// `strata-core` and implemented in `strata-blob`.
///
/// Checksums are fixed-length lowercase hex strings; the store derives its
/// own on-disk layout from them and reports back the storage path it chose.
#[async_trait]
pub trait BlobStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Write a payload under the given checksum, returning the storage path.
    ///
    /// Writing the same checksum twice is idempotent: the existing object
    /// is left in place and its path returned.
    async fn write(&self, checksum: &str, data: Bytes) -> AppResult<String>;

    /// Read the payload stored under the given checksum.
    async fn read(&self, checksum: &str) -> AppResult<Bytes>;

    /// Delete the payload stored under the given checksum.
    async fn delete(&self, checksum: &str) -> AppResult<()>;

    /// Check whether a payload exists for the given checksum.
    async fn exists(&self, checksum: &str) -> AppResult<bool>;
}

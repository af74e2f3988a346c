//! The commit seam between the cache engine and the version service.

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use strata_core::result::AppResult;
use strata_entity::settings::CacheSettings;
use strata_entity::version::{ChangeType, FileVersion};

/// Everything the commit side needs to persist one version.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// The file being versioned.
    pub file_id: Uuid,
    /// User who owns the file.
    pub owner_id: Uuid,
    /// The content to snapshot.
    pub content: Bytes,
    /// SHA-256 checksum of `content`.
    pub checksum: String,
    /// Protected from retention sweeps.
    pub is_high_priority: bool,
    /// What kind of write produced this version.
    pub change_type: ChangeType,
    /// Optional comment describing the change.
    pub comment: Option<String>,
    /// Whether the content passed through the debounce cache.
    pub was_cached: bool,
    /// Seconds the content spent buffered before commit.
    pub cache_duration_seconds: Option<i64>,
}

/// The version service contract the cache engine depends on.
///
/// Implemented by `strata-service`'s `CommitService`; tests substitute a
/// recording fake. The engine never sees the blob store or the database
/// directly — everything flows through this seam.
#[async_trait]
pub trait VersionCommitter: Send + Sync + std::fmt::Debug + 'static {
    /// Atomically persist one version snapshot.
    async fn commit_version(&self, request: CommitRequest) -> AppResult<FileVersion>;

    /// Effective settings for a user (per-user row or process defaults).
    async fn settings_for(&self, user_id: Uuid) -> AppResult<CacheSettings>;
}

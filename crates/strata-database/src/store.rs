//! The transactional version store trait.

use async_trait::async_trait;
use uuid::Uuid;

use strata_core::result::AppResult;
use strata_entity::blob::VersionBlob;
use strata_entity::settings::CacheSettings;
use strata_entity::version::{FileVersion, NewVersion};

/// How the commit transaction should handle the version's payload row.
#[derive(Debug, Clone)]
pub enum BlobDisposition {
    /// Reuse the existing blob with this checksum; its reference count is
    /// incremented inside the transaction. No new bytes were written.
    Reference {
        /// Checksum of the existing blob.
        checksum: String,
    },
    /// A new payload was written to the blob store; insert its row with
    /// `reference_count = 1`.
    Stored {
        /// Checksum of the new blob.
        checksum: String,
        /// Path the blob store chose for the payload.
        storage_path: String,
        /// Uncompressed content size in bytes.
        original_size: i64,
        /// Stored payload size in bytes.
        compressed_size: i64,
    },
}

/// Result of a retention purge.
#[derive(Debug, Clone, Default)]
pub struct PurgeOutcome {
    /// Number of version rows deleted.
    pub deleted_versions: u64,
    /// Stored bytes released from owners' quotas.
    pub freed_bytes: i64,
    /// Blob rows that reached zero references (and are not pinned); their
    /// physical payloads may now be reclaimed by the caller.
    pub reclaimable_blobs: Vec<VersionBlob>,
}

/// Transactional persistence seam for version history.
///
/// The production implementation is [`crate::PgVersionStore`]; tests run
/// against an in-memory fake with the same transactional semantics.
/// `commit_version` and `purge_versions` are atomic: either every row
/// change lands or none does, since a partial write would corrupt the
/// blob reference-count invariant.
#[async_trait]
pub trait VersionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a version by its id.
    async fn find_version(&self, id: Uuid) -> AppResult<Option<FileVersion>>;

    /// The most recent version of a file, if any.
    async fn latest_version(&self, file_id: Uuid) -> AppResult<Option<FileVersion>>;

    /// All versions of a file, newest first.
    async fn find_versions(&self, file_id: Uuid) -> AppResult<Vec<FileVersion>>;

    /// Number of versions currently retained for a file.
    async fn version_count(&self, file_id: Uuid) -> AppResult<i64>;

    /// Look up a blob row by content checksum.
    async fn find_blob(&self, checksum: &str) -> AppResult<Option<VersionBlob>>;

    /// Atomically insert a version row, apply the blob disposition, and
    /// bump the owner's stored usage (for non-reference commits).
    ///
    /// The version number is assigned inside the transaction as one more
    /// than the file's current maximum.
    async fn commit_version(
        &self,
        new: &NewVersion,
        disposition: &BlobDisposition,
    ) -> AppResult<FileVersion>;

    /// Per-user settings row, if one exists.
    async fn find_settings(&self, user_id: Uuid) -> AppResult<Option<CacheSettings>>;

    /// Insert or update a per-user settings row.
    async fn save_settings(&self, settings: &CacheSettings) -> AppResult<CacheSettings>;

    /// Distinct owners that currently have version rows.
    async fn users_with_versions(&self) -> AppResult<Vec<Uuid>>;

    /// Versions beyond the newest `depth` per file for one owner,
    /// excluding high-priority snapshots, oldest first.
    async fn versions_beyond_depth(
        &self,
        owner_id: Uuid,
        depth: i32,
    ) -> AppResult<Vec<FileVersion>>;

    /// Atomically delete version rows, decrement blob reference counts,
    /// release quota usage, and drop blob rows that became unreferenced.
    async fn purge_versions(&self, version_ids: &[Uuid]) -> AppResult<PurgeOutcome>;
}

//! Version commit service — dedup, compression, quota, atomic persistence.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use strata_blob::compress::{self, CompressedPayload};
use strata_blob::digest::sha256_hex;
use strata_cache::committer::{CommitRequest, VersionCommitter};
use strata_core::config::blob::BlobConfig;
use strata_core::config::versioning::VersioningConfig;
use strata_core::error::{AppError, ErrorKind};
use strata_core::result::AppResult;
use strata_core::traits::storage::BlobStorage;
use strata_database::store::{BlobDisposition, VersionStore};
use strata_entity::settings::{CacheSettings, QuotaSnapshot};
use strata_entity::version::{ChangeType, FileVersion, NewVersion};

use crate::retention::RetentionService;

/// Whether a new snapshot should be taken for incoming content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionDecision {
    /// Content differs from the latest version; snapshot it.
    Create,
    /// Content is identical to the latest version; a snapshot would be
    /// redundant.
    UnchangedContent,
}

impl VersionDecision {
    /// Whether a snapshot should be created.
    pub fn should_create(&self) -> bool {
        matches!(self, Self::Create)
    }
}

/// Parameters for the atomic commit operation.
#[derive(Debug, Clone)]
pub struct CreateVersionParams {
    /// The file being versioned.
    pub file_id: Uuid,
    /// User who owns the file.
    pub owner_id: Uuid,
    /// The content to snapshot.
    pub content: Bytes,
    /// Precomputed checksum; computed on the spot when absent.
    pub checksum: Option<String>,
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

/// Decides *how* a version is stored once a commit is triggered: reference
/// to an existing blob or new compressed payload, within the owner's quota.
///
/// Implements [`VersionCommitter`], the seam the cache engine flushes
/// through.
#[derive(Debug, Clone)]
pub struct CommitService {
    /// Transactional version store.
    store: Arc<dyn VersionStore>,
    /// Physical payload storage.
    blobs: Arc<dyn BlobStorage>,
    /// Retention service, invoked for the one cleanup retry on quota.
    retention: Arc<RetentionService>,
    /// Process-wide default settings.
    defaults: VersioningConfig,
    /// Blob store knobs (compression level).
    blob_config: BlobConfig,
}

impl CommitService {
    /// Creates a new commit service.
    pub fn new(
        store: Arc<dyn VersionStore>,
        blobs: Arc<dyn BlobStorage>,
        retention: Arc<RetentionService>,
        defaults: VersioningConfig,
        blob_config: BlobConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            retention,
            defaults,
            blob_config,
        }
    }

    /// Effective settings for a user: the per-user row when one exists,
    /// otherwise the process-wide defaults.
    pub async fn user_settings(&self, user_id: Uuid) -> AppResult<CacheSettings> {
        Ok(match self.store.find_settings(user_id).await? {
            Some(settings) => settings,
            None => CacheSettings::from_defaults(user_id, &self.defaults),
        })
    }

    /// Per-user quota state for admin surfaces.
    pub async fn quota_snapshot(&self, user_id: Uuid) -> AppResult<QuotaSnapshot> {
        Ok(QuotaSnapshot::from_settings(&self.user_settings(user_id).await?))
    }

    /// Deterministic content hash used for dedup lookup and integrity
    /// verification: SHA-256 as 64 lowercase hex chars.
    pub fn compute_checksum(content: &[u8]) -> String {
        sha256_hex(content)
    }

    /// Whether incoming content warrants a new snapshot, given the file's
    /// most recent version.
    pub fn should_create_version(
        latest: Option<&FileVersion>,
        checksum: &str,
    ) -> VersionDecision {
        match latest {
            Some(version) if version.blob_checksum == checksum => {
                VersionDecision::UnchangedContent
            }
            _ => VersionDecision::Create,
        }
    }

    /// The atomic commit operation.
    ///
    /// Dedups against the blob store, compresses new payloads, enforces
    /// the owner's quota (with a single cleanup retry), and persists the
    /// version and blob rows in one transaction. A transaction failure
    /// rolls everything back and the physically written payload is
    /// removed again.
    pub async fn create_version(&self, params: CreateVersionParams) -> AppResult<FileVersion> {
        let mut settings = self.user_settings(params.owner_id).await?;
        if !settings.is_enabled {
            return Err(AppError::validation(format!(
                "Version caching is disabled for user {}",
                params.owner_id
            )));
        }

        let checksum = match params.checksum.clone() {
            Some(checksum) => checksum,
            None => Self::compute_checksum(&params.content),
        };
        let original_size = params.content.len() as i64;
        let new = NewVersion {
            file_id: params.file_id,
            owner_id: params.owner_id,
            checksum: checksum.clone(),
            original_size,
            is_high_priority: params.is_high_priority,
            change_type: params.change_type,
            comment: params.comment.clone(),
            was_cached: params.was_cached,
            cache_duration_seconds: params.cache_duration_seconds,
        };

        // Dedup fast path: identical content already stored by anyone.
        if settings.dedupe_enabled {
            if let Some(blob) = self.store.find_blob(&checksum).await? {
                let version = self
                    .store
                    .commit_version(
                        &new,
                        &BlobDisposition::Reference {
                            checksum: checksum.clone(),
                        },
                    )
                    .await?;
                info!(
                    file_id = %params.file_id,
                    version = version.version_number,
                    references = blob.reference_count + 1,
                    "Deduplicated version against existing blob"
                );
                self.note_depth_overflow(&version, settings.depth).await;
                return Ok(version);
            }
        }

        // New payload: compress, check quota, write bytes, then the rows.
        let payload = if settings.compression_enabled {
            compress::compress(&params.content, self.blob_config.compression_level)?
        } else {
            CompressedPayload {
                data: params.content.clone(),
                is_compressed: false,
            }
        };
        let compressed_size = payload.data.len() as i64;

        if settings.would_exceed(compressed_size) {
            // One shot at freeing eligible space before rejecting.
            let report = self
                .retention
                .run_cleanup(Some(params.owner_id), false)
                .await?;
            if report.deleted_versions > 0 {
                settings = self.user_settings(params.owner_id).await?;
            }
            if settings.would_exceed(compressed_size) {
                return Err(AppError::quota_exceeded(format!(
                    "Storing {compressed_size} bytes would exceed quota ({} of {} bytes used)",
                    settings.current_usage_bytes, settings.max_size_bytes
                )));
            }
        }

        let storage_path = self.blobs.write(&checksum, payload.data.clone()).await?;
        let disposition = BlobDisposition::Stored {
            checksum: checksum.clone(),
            storage_path,
            original_size,
            compressed_size,
        };

        let version = match self.store.commit_version(&new, &disposition).await {
            Ok(version) => version,
            Err(e) if e.kind == ErrorKind::Conflict => {
                // The payload landed under this checksum through another
                // commit (dedup disabled, or a concurrent writer). The
                // bytes are identical by construction, so reference them.
                debug!(checksum = %checksum, "Blob already exists, committing as reference");
                self.store
                    .commit_version(
                        &new,
                        &BlobDisposition::Reference {
                            checksum: checksum.clone(),
                        },
                    )
                    .await?
            }
            Err(e) => {
                // The row transaction rolled back; take the payload back
                // out so no orphaned bytes survive.
                if let Err(cleanup_err) = self.blobs.delete(&checksum).await {
                    warn!(
                        checksum = %checksum,
                        error = %cleanup_err,
                        "Failed to remove orphaned blob after rollback"
                    );
                }
                return Err(AppError::with_source(
                    ErrorKind::CommitFailed,
                    format!("Version commit failed for file {}", params.file_id),
                    e,
                ));
            }
        };

        info!(
            file_id = %params.file_id,
            owner_id = %params.owner_id,
            version = version.version_number,
            original_size,
            compressed_size,
            compressed = payload.is_compressed,
            "Version committed"
        );

        self.note_depth_overflow(&version, settings.depth).await;
        Ok(version)
    }

    /// Depth enforcement never blocks a commit: overflow is observed and
    /// left for the retention sweep.
    async fn note_depth_overflow(&self, version: &FileVersion, depth: i32) {
        match self.store.version_count(version.file_id).await {
            Ok(count) if count > depth as i64 => {
                debug!(
                    file_id = %version.file_id,
                    count,
                    depth,
                    "File exceeds retention depth, oldest versions are cleanup-eligible"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    file_id = %version.file_id,
                    error = %e,
                    "Failed to check retention depth"
                );
            }
        }
    }
}

#[async_trait]
impl VersionCommitter for CommitService {
    async fn commit_version(&self, request: CommitRequest) -> AppResult<FileVersion> {
        let latest = self.store.latest_version(request.file_id).await?;
        if let Some(latest) = latest {
            if !Self::should_create_version(Some(&latest), &request.checksum).should_create() {
                debug!(
                    file_id = %request.file_id,
                    version = latest.version_number,
                    "Content unchanged since latest version, skipping snapshot"
                );
                return Ok(latest);
            }
        }

        self.create_version(CreateVersionParams {
            file_id: request.file_id,
            owner_id: request.owner_id,
            content: request.content,
            checksum: Some(request.checksum),
            is_high_priority: request.is_high_priority,
            change_type: request.change_type,
            comment: request.comment,
            was_cached: request.was_cached,
            cache_duration_seconds: request.cache_duration_seconds,
        })
        .await
    }

    async fn settings_for(&self, user_id: Uuid) -> AppResult<CacheSettings> {
        self.user_settings(user_id).await
    }
}

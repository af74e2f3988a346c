//! Quota headroom checks and the depth-based retention sweep.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use strata_core::config::versioning::VersioningConfig;
use strata_core::result::AppResult;
use strata_core::traits::storage::BlobStorage;
use strata_database::store::VersionStore;
use strata_entity::settings::{CacheSettings, QuotaSnapshot};

/// Outcome of a retention sweep (or its dry-run preview).
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupReport {
    /// Version rows removed (or that would be removed).
    pub deleted_versions: u64,
    /// Stored bytes released from owners' quotas.
    pub freed_bytes: i64,
    /// Users whose history was touched.
    pub affected_users: usize,
}

/// Keeps cumulative stored bytes within quota by sweeping versions beyond
/// each file's retention depth.
#[derive(Debug, Clone)]
pub struct RetentionService {
    /// Transactional version store.
    store: Arc<dyn VersionStore>,
    /// Physical payload storage, for reclaiming unreferenced blobs.
    blobs: Arc<dyn BlobStorage>,
    /// Process-wide default settings.
    defaults: VersioningConfig,
}

impl RetentionService {
    /// Creates a new retention service.
    pub fn new(
        store: Arc<dyn VersionStore>,
        blobs: Arc<dyn BlobStorage>,
        defaults: VersioningConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            defaults,
        }
    }

    /// Whether usage has crossed the user's cleanup headroom threshold.
    pub fn cleanup_needed(&self, settings: &CacheSettings) -> bool {
        QuotaSnapshot::from_settings(settings).cleanup_needed
    }

    /// Sweep one user's history (or every user's, when `owner` is `None`):
    /// for each file beyond its retained depth, the oldest non-high-priority
    /// versions are removed, blob reference counts decremented, and blobs
    /// that become unreferenced physically reclaimed.
    ///
    /// With `dry_run` the identical report is computed without mutating
    /// anything — this is the admin preview.
    pub async fn run_cleanup(&self, owner: Option<Uuid>, dry_run: bool) -> AppResult<CleanupReport> {
        let users = match owner {
            Some(user_id) => vec![user_id],
            None => self.store.users_with_versions().await?,
        };

        let mut report = CleanupReport::default();
        for user_id in users {
            match self.cleanup_user(user_id, dry_run).await {
                Ok((deleted, freed)) => {
                    if deleted > 0 {
                        report.deleted_versions += deleted;
                        report.freed_bytes += freed;
                        report.affected_users += 1;
                    }
                }
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Cleanup failed for user, continuing");
                }
            }
        }

        info!(
            dry_run,
            deleted_versions = report.deleted_versions,
            freed_bytes = report.freed_bytes,
            affected_users = report.affected_users,
            "Retention sweep finished"
        );
        Ok(report)
    }

    /// Sweep a single user, returning `(deleted_versions, freed_bytes)`.
    async fn cleanup_user(&self, user_id: Uuid, dry_run: bool) -> AppResult<(u64, i64)> {
        let depth = match self.store.find_settings(user_id).await? {
            Some(settings) => settings.depth,
            None => self.defaults.depth,
        };

        let candidates = self.store.versions_beyond_depth(user_id, depth).await?;
        if candidates.is_empty() {
            return Ok((0, 0));
        }

        if dry_run {
            // Same arithmetic the purge applies, with no mutation.
            let freed = candidates
                .iter()
                .filter(|version| version.storage_type.counts_against_quota())
                .map(|version| version.compressed_size)
                .sum();
            return Ok((candidates.len() as u64, freed));
        }

        let ids: Vec<Uuid> = candidates.iter().map(|version| version.id).collect();
        let outcome = self.store.purge_versions(&ids).await?;

        for blob in &outcome.reclaimable_blobs {
            if let Err(e) = self.blobs.delete(&blob.checksum).await {
                warn!(
                    checksum = %blob.checksum,
                    error = %e,
                    "Failed to reclaim unreferenced blob payload"
                );
            }
        }

        Ok((outcome.deleted_versions, outcome.freed_bytes))
    }
}

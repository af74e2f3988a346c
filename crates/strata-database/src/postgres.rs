//! PostgreSQL implementation of the version store.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use strata_core::config::versioning::VersioningConfig;
use strata_core::error::{AppError, ErrorKind};
use strata_core::result::AppResult;
use strata_entity::blob::VersionBlob;
use strata_entity::settings::CacheSettings;
use strata_entity::version::{FileVersion, NewVersion, StorageType};

use crate::store::{BlobDisposition, PurgeOutcome, VersionStore};

/// Version store backed by PostgreSQL.
///
/// Holds the process-wide versioning defaults so that usage accounting can
/// lazily materialize a `cache_settings` row for users who never customized
/// their settings.
#[derive(Debug, Clone)]
pub struct PgVersionStore {
    pool: PgPool,
    defaults: VersioningConfig,
}

impl PgVersionStore {
    /// Create a new PostgreSQL version store.
    pub fn new(pool: PgPool, defaults: VersioningConfig) -> Self {
        Self { pool, defaults }
    }
}

#[async_trait]
impl VersionStore for PgVersionStore {
    async fn find_version(&self, id: Uuid) -> AppResult<Option<FileVersion>> {
        sqlx::query_as::<_, FileVersion>("SELECT * FROM file_versions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find version", e))
    }

    async fn latest_version(&self, file_id: Uuid) -> AppResult<Option<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE file_id = $1 ORDER BY version_number DESC LIMIT 1",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find latest version", e)
        })
    }

    async fn find_versions(&self, file_id: Uuid) -> AppResult<Vec<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE file_id = $1 ORDER BY version_number DESC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list versions", e))
    }

    async fn version_count(&self, file_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM file_versions WHERE file_id = $1")
            .bind(file_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count versions", e))
    }

    async fn find_blob(&self, checksum: &str) -> AppResult<Option<VersionBlob>> {
        sqlx::query_as::<_, VersionBlob>("SELECT * FROM version_blobs WHERE checksum = $1")
            .bind(checksum)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find blob", e))
    }

    async fn commit_version(
        &self,
        new: &NewVersion,
        disposition: &BlobDisposition,
    ) -> AppResult<FileVersion> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin commit transaction", e)
        })?;

        let version_number: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version_number), 0) + 1 FROM file_versions WHERE file_id = $1",
        )
        .bind(new.file_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to assign version number", e)
        })?;

        let (storage_type, blob) = match disposition {
            BlobDisposition::Reference { checksum } => {
                let blob = sqlx::query_as::<_, VersionBlob>(
                    "UPDATE version_blobs \
                     SET reference_count = reference_count + 1, \
                         is_pinned = is_pinned OR $2, \
                         last_accessed = NOW() \
                     WHERE checksum = $1 RETURNING *",
                )
                .bind(checksum)
                .bind(new.is_high_priority)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to increment blob", e)
                })?
                .ok_or_else(|| {
                    AppError::conflict(format!("No blob exists for checksum {checksum}"))
                })?;
                (StorageType::Reference, blob)
            }
            BlobDisposition::Stored {
                checksum,
                storage_path,
                original_size,
                compressed_size,
            } => {
                let blob = sqlx::query_as::<_, VersionBlob>(
                    "INSERT INTO version_blobs \
                     (id, checksum, storage_path, original_size, compressed_size, reference_count, is_pinned) \
                     VALUES ($1, $2, $3, $4, $5, 1, $6) RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(checksum)
                .bind(storage_path)
                .bind(original_size)
                .bind(compressed_size)
                .bind(new.is_high_priority)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db_err)
                        if db_err.constraint() == Some("version_blobs_checksum_key") =>
                    {
                        AppError::conflict(format!("Blob {checksum} already exists"))
                    }
                    _ => AppError::with_source(ErrorKind::Database, "Failed to insert blob", e),
                })?;
                (StorageType::Stored, blob)
            }
        };

        let version = sqlx::query_as::<_, FileVersion>(
            "INSERT INTO file_versions \
             (id, file_id, owner_id, version_number, storage_type, blob_checksum, \
              original_size, compressed_size, is_high_priority, change_type, comment, \
              was_cached, cache_duration_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.file_id)
        .bind(new.owner_id)
        .bind(version_number)
        .bind(storage_type)
        .bind(&blob.checksum)
        .bind(blob.original_size)
        .bind(blob.compressed_size)
        .bind(new.is_high_priority)
        .bind(new.change_type)
        .bind(&new.comment)
        .bind(new.was_cached)
        .bind(new.cache_duration_seconds)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert version", e))?;

        // Stored commits add to the owner's quota; reference commits do not.
        if let BlobDisposition::Stored { compressed_size, .. } = disposition {
            sqlx::query(
                "INSERT INTO cache_settings \
                 (user_id, max_size_bytes, current_usage_bytes, depth, headroom_percent, \
                  is_enabled, compression_enabled, dedupe_enabled, \
                  debounce_window_seconds, max_batch_window_seconds) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (user_id) DO UPDATE \
                 SET current_usage_bytes = cache_settings.current_usage_bytes + EXCLUDED.current_usage_bytes",
            )
            .bind(new.owner_id)
            .bind(self.defaults.max_size_bytes)
            .bind(compressed_size)
            .bind(self.defaults.depth)
            .bind(self.defaults.headroom_percent)
            .bind(self.defaults.enabled)
            .bind(self.defaults.compression_enabled)
            .bind(self.defaults.dedupe_enabled)
            .bind(self.defaults.debounce_window_seconds)
            .bind(self.defaults.max_batch_window_seconds)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update usage", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit version transaction", e)
        })?;

        Ok(version)
    }

    async fn find_settings(&self, user_id: Uuid) -> AppResult<Option<CacheSettings>> {
        sqlx::query_as::<_, CacheSettings>("SELECT * FROM cache_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find settings", e))
    }

    async fn save_settings(&self, settings: &CacheSettings) -> AppResult<CacheSettings> {
        sqlx::query_as::<_, CacheSettings>(
            "INSERT INTO cache_settings \
             (user_id, max_size_bytes, current_usage_bytes, depth, headroom_percent, \
              is_enabled, compression_enabled, dedupe_enabled, \
              debounce_window_seconds, max_batch_window_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (user_id) DO UPDATE \
             SET max_size_bytes = EXCLUDED.max_size_bytes, \
                 depth = EXCLUDED.depth, \
                 headroom_percent = EXCLUDED.headroom_percent, \
                 is_enabled = EXCLUDED.is_enabled, \
                 compression_enabled = EXCLUDED.compression_enabled, \
                 dedupe_enabled = EXCLUDED.dedupe_enabled, \
                 debounce_window_seconds = EXCLUDED.debounce_window_seconds, \
                 max_batch_window_seconds = EXCLUDED.max_batch_window_seconds \
             RETURNING *",
        )
        .bind(settings.user_id)
        .bind(settings.max_size_bytes)
        .bind(settings.current_usage_bytes)
        .bind(settings.depth)
        .bind(settings.headroom_percent)
        .bind(settings.is_enabled)
        .bind(settings.compression_enabled)
        .bind(settings.dedupe_enabled)
        .bind(settings.debounce_window_seconds)
        .bind(settings.max_batch_window_seconds)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save settings", e))
    }

    async fn users_with_versions(&self) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT DISTINCT owner_id FROM file_versions")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list owners", e))
    }

    async fn versions_beyond_depth(
        &self,
        owner_id: Uuid,
        depth: i32,
    ) -> AppResult<Vec<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM (\
                SELECT *, ROW_NUMBER() OVER (PARTITION BY file_id ORDER BY version_number DESC) AS r_num \
                FROM file_versions WHERE owner_id = $1\
             ) t WHERE t.r_num > $2 AND NOT t.is_high_priority \
             ORDER BY t.file_id, t.version_number ASC",
        )
        .bind(owner_id)
        .bind(depth as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find retention candidates", e)
        })
    }

    async fn purge_versions(&self, version_ids: &[Uuid]) -> AppResult<PurgeOutcome> {
        if version_ids.is_empty() {
            return Ok(PurgeOutcome::default());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin purge transaction", e)
        })?;

        let victims = sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE id = ANY($1)",
        )
        .bind(version_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load purge victims", e)
        })?;

        if victims.is_empty() {
            return Ok(PurgeOutcome::default());
        }

        let deleted = sqlx::query("DELETE FROM file_versions WHERE id = ANY($1)")
            .bind(version_ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete versions", e)
            })?
            .rows_affected();

        let mut decrements: HashMap<&str, i32> = HashMap::new();
        for victim in &victims {
            *decrements.entry(victim.blob_checksum.as_str()).or_default() += 1;
        }

        let mut reclaimable = Vec::new();
        for (checksum, count) in decrements {
            let blob = sqlx::query_as::<_, VersionBlob>(
                "UPDATE version_blobs \
                 SET reference_count = GREATEST(reference_count - $2, 0) \
                 WHERE checksum = $1 RETURNING *",
            )
            .bind(checksum)
            .bind(count)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to decrement blob", e)
            })?;

            if let Some(blob) = blob {
                if blob.can_delete() {
                    sqlx::query("DELETE FROM version_blobs WHERE id = $1")
                        .bind(blob.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| {
                            AppError::with_source(ErrorKind::Database, "Failed to delete blob", e)
                        })?;
                    reclaimable.push(blob);
                }
            }
        }

        let mut released: HashMap<Uuid, i64> = HashMap::new();
        for victim in &victims {
            if victim.storage_type.counts_against_quota() {
                *released.entry(victim.owner_id).or_default() += victim.compressed_size;
            }
        }
        for (owner_id, bytes) in &released {
            sqlx::query(
                "UPDATE cache_settings \
                 SET current_usage_bytes = GREATEST(current_usage_bytes - $2, 0) \
                 WHERE user_id = $1",
            )
            .bind(owner_id)
            .bind(bytes)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to release usage", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit purge transaction", e)
        })?;

        Ok(PurgeOutcome {
            deleted_versions: deleted,
            freed_bytes: released.values().sum(),
            reclaimable_blobs: reclaimable,
        })
    }
}

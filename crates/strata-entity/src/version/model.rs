//! File version entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::kind::{ChangeType, StorageType};

/// One committed snapshot of a file.
///
/// Rows are created exactly once at flush time and never mutated;
/// only retention deletes them. `version_number` is strictly increasing
/// per file and never reused.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileVersion {
    /// Unique version identifier.
    pub id: Uuid,
    /// The file this version belongs to.
    pub file_id: Uuid,
    /// User who owns the file.
    pub owner_id: Uuid,
    /// Sequential version number, starting at 1 per file.
    pub version_number: i32,
    /// Whether this version owns its bytes or references an existing blob.
    pub storage_type: StorageType,
    /// SHA-256 checksum of the content, 64 lowercase hex chars. Immutable.
    pub blob_checksum: String,
    /// Size of the uncompressed content in bytes.
    pub original_size: i64,
    /// Size of the stored payload in bytes.
    pub compressed_size: i64,
    /// Protected from retention sweeps.
    pub is_high_priority: bool,
    /// What kind of write produced this version.
    pub change_type: ChangeType,
    /// Optional comment describing the change.
    pub comment: Option<String>,
    /// Whether this version passed through the debounce cache.
    pub was_cached: bool,
    /// Seconds the content spent buffered before commit.
    pub cache_duration_seconds: Option<i64>,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
}

impl FileVersion {
    /// Compression ratio of the stored payload (1.0 = incompressible).
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            1.0
        } else {
            self.compressed_size as f64 / self.original_size as f64
        }
    }
}

/// Parameters for inserting a new version row.
///
/// The version number is assigned inside the commit transaction, not here.
#[derive(Debug, Clone)]
pub struct NewVersion {
    /// The file being versioned.
    pub file_id: Uuid,
    /// User who owns the file.
    pub owner_id: Uuid,
    /// Content checksum.
    pub checksum: String,
    /// Uncompressed content size in bytes.
    pub original_size: i64,
    /// Protected from retention sweeps.
    pub is_high_priority: bool,
    /// What kind of write produced this version.
    pub change_type: ChangeType,
    /// Optional comment describing the change.
    pub comment: Option<String>,
    /// Whether this version passed through the debounce cache.
    pub was_cached: bool,
    /// Seconds the content spent buffered before commit.
    pub cache_duration_seconds: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_ratio() {
        let version = FileVersion {
            id: Uuid::new_v4(),
            file_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            version_number: 1,
            storage_type: StorageType::Stored,
            blob_checksum: "ab".repeat(32),
            original_size: 1000,
            compressed_size: 250,
            is_high_priority: false,
            change_type: ChangeType::Batched,
            comment: None,
            was_cached: true,
            cache_duration_seconds: Some(30),
            created_at: Utc::now(),
        };
        assert!((version.compression_ratio() - 0.25).abs() < f64::EPSILON);
    }
}

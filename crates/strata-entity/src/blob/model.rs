//! Version blob entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The deduplicated physical payload behind one or more versions,
/// keyed by content checksum.
///
/// `reference_count` equals the number of [`crate::version::FileVersion`]
/// rows currently pointing at this blob. A blob becomes pinned the first
/// time a high-priority version references it and stays pinned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VersionBlob {
    /// Unique blob identifier.
    pub id: Uuid,
    /// SHA-256 checksum of the uncompressed content. Unique.
    pub checksum: String,
    /// Path of the payload within the blob store.
    pub storage_path: String,
    /// Size of the uncompressed content in bytes.
    pub original_size: i64,
    /// Size of the stored payload in bytes.
    pub compressed_size: i64,
    /// Number of versions currently referencing this blob.
    pub reference_count: i32,
    /// Referenced by at least one high-priority version, ever.
    pub is_pinned: bool,
    /// When this blob was first stored.
    pub created_at: DateTime<Utc>,
    /// Last time a version commit touched this blob.
    pub last_accessed: DateTime<Utc>,
}

impl VersionBlob {
    /// Whether the physical payload may be reclaimed.
    pub fn can_delete(&self) -> bool {
        self.reference_count == 0 && !self.is_pinned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(reference_count: i32, is_pinned: bool) -> VersionBlob {
        VersionBlob {
            id: Uuid::new_v4(),
            checksum: "cd".repeat(32),
            storage_path: "cd/cd/test".to_string(),
            original_size: 100,
            compressed_size: 40,
            reference_count,
            is_pinned,
            created_at: Utc::now(),
            last_accessed: Utc::now(),
        }
    }

    #[test]
    fn test_can_delete() {
        assert!(blob(0, false).can_delete());
        assert!(!blob(1, false).can_delete());
        assert!(!blob(0, true).can_delete());
    }
}

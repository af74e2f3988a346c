//! Aggregate statistics over the debounce cache, servable to admin surfaces.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One pending entry, as reported by the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntryInfo {
    /// The file whose edit is buffered.
    pub file_id: Uuid,
    /// User who owns the buffered edit.
    pub owner_id: Uuid,
    /// Seconds since the first buffered edit.
    pub age_seconds: u64,
    /// Buffered content size in bytes.
    pub size_bytes: u64,
    /// Protected from retention sweeps once committed.
    pub is_high_priority: bool,
}

/// Aggregate view over all pending entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Number of files with a buffered edit.
    pub pending_count: usize,
    /// Total buffered bytes across all entries.
    pub total_buffered_bytes: u64,
    /// Age in seconds of the oldest pending entry, if any.
    pub oldest_age_seconds: Option<u64>,
    /// Per-file breakdown.
    pub entries: Vec<PendingEntryInfo>,
}

impl CacheInfo {
    /// An empty cache report.
    pub fn empty() -> Self {
        Self {
            pending_count: 0,
            total_buffered_bytes: 0,
            oldest_age_seconds: None,
            entries: Vec::new(),
        }
    }
}

//! The in-memory pending entry.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use uuid::Uuid;

/// One file's buffered, not-yet-committed edit.
///
/// Created on the first `queue_version` call for a file, overwritten in
/// place by subsequent calls, and destroyed the moment a flush commits or
/// a cache clear discards it. Never persisted.
#[derive(Debug, Clone)]
pub struct PendingVersion {
    /// The file whose edit is buffered.
    pub file_id: Uuid,
    /// User who owns the buffered edit.
    pub owner_id: Uuid,
    /// Latest content bytes.
    pub content: Bytes,
    /// Checksum of `content`.
    pub checksum: String,
    /// Sticky priority flag: once set by any write in the burst, it stays.
    pub is_high_priority: bool,
    /// Newest non-empty comment seen in the burst.
    pub comment: Option<String>,
    /// When the first write of the burst arrived.
    pub first_modified: Instant,
    /// When the most recent write arrived.
    pub last_modified: Instant,
    /// Inactivity window before this entry may commit.
    pub debounce_window: Duration,
    /// Hard cap on total buffering time for this entry.
    pub max_batch_window: Duration,
}

impl PendingVersion {
    /// Buffered content size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }

    /// Time since the burst started.
    pub fn time_in_cache(&self, now: Instant) -> Duration {
        now.duration_since(self.first_modified)
    }

    /// Time since the most recent write.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.duration_since(self.last_modified)
    }
}

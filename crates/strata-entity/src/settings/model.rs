//! Cache settings entity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use strata_core::config::versioning::VersioningConfig;

/// Per-user version caching configuration and quota state.
///
/// `current_usage_bytes` tracks the sum of stored (non-reference) payload
/// bytes attributable to the user. Users without a row fall back to the
/// process-wide defaults from [`VersioningConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CacheSettings {
    /// The user these settings belong to.
    pub user_id: Uuid,
    /// Maximum stored bytes for this user.
    pub max_size_bytes: i64,
    /// Stored bytes currently attributed to this user.
    pub current_usage_bytes: i64,
    /// Versions retained per file before retention sweeps the oldest.
    pub depth: i32,
    /// Usage percentage at which cleanup becomes eligible (0-100).
    pub headroom_percent: i16,
    /// Whether version caching is enabled for this user.
    pub is_enabled: bool,
    /// Whether new blobs are compressed.
    pub compression_enabled: bool,
    /// Whether identical content is deduplicated.
    pub dedupe_enabled: bool,
    /// Inactivity window after the last write before a commit is allowed.
    pub debounce_window_seconds: i64,
    /// Hard cap on buffering time regardless of continued activity.
    pub max_batch_window_seconds: i64,
}

impl CacheSettings {
    /// Build effective settings for a user from the process-wide defaults.
    pub fn from_defaults(user_id: Uuid, defaults: &VersioningConfig) -> Self {
        Self {
            user_id,
            max_size_bytes: defaults.max_size_bytes,
            current_usage_bytes: 0,
            depth: defaults.depth,
            headroom_percent: defaults.headroom_percent,
            is_enabled: defaults.enabled,
            compression_enabled: defaults.compression_enabled,
            dedupe_enabled: defaults.dedupe_enabled,
            debounce_window_seconds: defaults.debounce_window_seconds,
            max_batch_window_seconds: defaults.max_batch_window_seconds,
        }
    }

    /// Check if adding the given number of stored bytes would exceed the quota.
    pub fn would_exceed(&self, additional_bytes: i64) -> bool {
        (self.current_usage_bytes + additional_bytes) > self.max_size_bytes
    }
}

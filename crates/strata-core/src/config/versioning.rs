//! Process-wide default version settings.

use serde::{Deserialize, Serialize};

/// Defaults applied to any user without a `cache_settings` row.
///
/// Field meanings match the per-user settings entity: quotas are in bytes,
/// `depth` is the number of versions retained per file, and the two windows
/// drive the debounce engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Whether version caching is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum stored (non-reference) bytes per user.
    #[serde(default = "default_max_size")]
    pub max_size_bytes: i64,
    /// Versions retained per file before retention sweeps the oldest.
    #[serde(default = "default_depth")]
    pub depth: i32,
    /// Usage percentage at which cleanup becomes eligible.
    #[serde(default = "default_headroom")]
    pub headroom_percent: i16,
    /// Whether new blobs are gzip-compressed.
    #[serde(default = "default_true")]
    pub compression_enabled: bool,
    /// Whether identical content is deduplicated against existing blobs.
    #[serde(default = "default_true")]
    pub dedupe_enabled: bool,
    /// Inactivity window after the last write before a commit is allowed.
    #[serde(default = "default_debounce_window")]
    pub debounce_window_seconds: i64,
    /// Hard cap on how long a file may stay buffered regardless of activity.
    #[serde(default = "default_max_batch_window")]
    pub max_batch_window_seconds: i64,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: default_max_size(),
            depth: default_depth(),
            headroom_percent: default_headroom(),
            compression_enabled: true,
            dedupe_enabled: true,
            debounce_window_seconds: default_debounce_window(),
            max_batch_window_seconds: default_max_batch_window(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_size() -> i64 {
    10_737_418_240 // 10 GB
}

fn default_depth() -> i32 {
    10
}

fn default_headroom() -> i16 {
    90
}

fn default_debounce_window() -> i64 {
    30
}

fn default_max_batch_window() -> i64 {
    300
}

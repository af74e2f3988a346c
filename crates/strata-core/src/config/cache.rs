//! Debounce cache engine configuration.

use serde::{Deserialize, Serialize};

/// Mechanical knobs for the in-memory debounce cache.
///
/// The debounce and batch windows themselves are per-user settings (with
/// process-wide defaults in [`super::versioning::VersioningConfig`]); this
/// section only configures the engine machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Extra margin in milliseconds added when a flush timer fires early
    /// because a newer write raced it and it must reschedule.
    #[serde(default = "default_reschedule_margin")]
    pub reschedule_margin_ms: u64,
    /// Largest payload the cache will buffer in memory. Writes above this
    /// ceiling are rejected so callers fall back to committing directly.
    #[serde(default = "default_max_payload")]
    pub max_payload_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reschedule_margin_ms: default_reschedule_margin(),
            max_payload_bytes: default_max_payload(),
        }
    }
}

fn default_reschedule_margin() -> u64 {
    250
}

fn default_max_payload() -> u64 {
    52_428_800 // 50 MB
}

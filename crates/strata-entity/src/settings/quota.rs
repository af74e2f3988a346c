//! Quota snapshot value object.

use serde::{Deserialize, Serialize};

use super::model::CacheSettings;

/// Point-in-time quota state for one user, servable to admin surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Total quota in bytes.
    pub max_size_bytes: i64,
    /// Currently used stored bytes.
    pub current_usage_bytes: i64,
    /// Remaining bytes before the quota is hit.
    pub available_bytes: i64,
    /// Usage percentage (0.0 - 100.0).
    pub usage_percent: f64,
    /// Whether usage has crossed the cleanup headroom threshold.
    pub cleanup_needed: bool,
}

impl QuotaSnapshot {
    /// Compute a snapshot from the user's settings row.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        let usage_percent = if settings.max_size_bytes == 0 {
            0.0
        } else {
            (settings.current_usage_bytes as f64 / settings.max_size_bytes as f64) * 100.0
        };

        Self {
            max_size_bytes: settings.max_size_bytes,
            current_usage_bytes: settings.current_usage_bytes,
            available_bytes: (settings.max_size_bytes - settings.current_usage_bytes).max(0),
            usage_percent,
            cleanup_needed: usage_percent >= settings.headroom_percent as f64,
        }
    }
}

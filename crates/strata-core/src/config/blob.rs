//! Physical blob storage configuration.

use serde::{Deserialize, Serialize};

/// Content-addressed blob store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Root directory for the content-addressed payload tree.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Gzip compression level (0-9).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            compression_level: default_compression_level(),
        }
    }
}

fn default_root_path() -> String {
    "./data/blobs".to_string()
}

fn default_compression_level() -> u32 {
    6
}

//! Blob storage provider implementations.

pub mod local;
pub mod memory;

use strata_core::error::AppError;
use strata_core::result::AppResult;

use crate::digest::is_valid_checksum;

/// Relative storage path for a checksum: two shard levels then the full
/// checksum (`ab/cd/<checksum>`), keeping directory fanout bounded.
pub(crate) fn shard_path(checksum: &str) -> AppResult<String> {
    if !is_valid_checksum(checksum) {
        return Err(AppError::validation(format!(
            "Invalid content checksum: {checksum}"
        )));
    }
    Ok(format!("{}/{}/{}", &checksum[0..2], &checksum[2..4], checksum))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_path() {
        let checksum = "ab".repeat(32);
        assert_eq!(
            shard_path(&checksum).unwrap(),
            format!("ab/ab/{checksum}")
        );
        assert!(shard_path("short").is_err());
    }
}

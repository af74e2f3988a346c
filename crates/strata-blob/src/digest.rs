//! Content checksums.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const CHECKSUM_LEN: usize = 64;

/// Compute the SHA-256 checksum of the given content as a 64-character
/// lowercase hex string. This string is the blob store's primary key.
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Whether a string is a plausible content checksum.
pub fn is_valid_checksum(checksum: &str) -> bool {
    checksum.len() == CHECKSUM_LEN && checksum.bytes().all(|b| b.is_ascii_hexdigit())
}

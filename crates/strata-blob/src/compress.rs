//! Gzip payload compression.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use strata_core::result::AppResult;

/// Outcome of compressing a payload before storage.
#[derive(Debug, Clone)]
pub struct CompressedPayload {
    /// The bytes to store.
    pub data: Bytes,
    /// Whether `data` is gzip-compressed or the raw input.
    pub is_compressed: bool,
}

/// Gzip-compress a payload, falling back to the raw bytes when compression
/// does not shrink them (already-compressed media, encrypted content).
pub fn compress(content: &[u8], level: u32) -> AppResult<CompressedPayload> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(content.len() / 2),
        Compression::new(level.min(9)),
    );
    encoder.write_all(content)?;
    let compressed = encoder.finish()?;

    if compressed.len() < content.len() {
        Ok(CompressedPayload {
            data: Bytes::from(compressed),
            is_compressed: true,
        })
    } else {
        Ok(CompressedPayload {
            data: Bytes::copy_from_slice(content),
            is_compressed: false,
        })
    }
}

/// Decompress a payload stored by [`compress`].
///
/// Raw-stored payloads (the incompressible fallback) are detected by size:
/// callers pass the recorded original size; when it equals the stored size
/// the payload was never compressed.
pub fn decompress(stored: &[u8], original_size: usize) -> AppResult<Bytes> {
    if stored.len() == original_size {
        return Ok(Bytes::copy_from_slice(stored));
    }

    let mut decoder = GzDecoder::new(stored);
    let mut out = Vec::with_capacity(original_size);
    decoder.read_to_end(&mut out)?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_shrinks_text() {
        let content = "versioned content ".repeat(200);
        let payload = compress(content.as_bytes(), 6).unwrap();
        assert!(payload.is_compressed);
        assert!(payload.data.len() < content.len());

        let restored = decompress(&payload.data, content.len()).unwrap();
        assert_eq!(&restored[..], content.as_bytes());
    }

    #[test]
    fn test_incompressible_fallback() {
        // A short high-entropy payload that gzip cannot shrink.
        let content: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(97) ^ 0x5a).collect();
        let payload = compress(&content, 6).unwrap();
        assert!(!payload.is_compressed);
        assert_eq!(&payload.data[..], &content[..]);

        let restored = decompress(&payload.data, content.len()).unwrap();
        assert_eq!(&restored[..], &content[..]);
    }
}

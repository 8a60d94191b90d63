//! Gzip helpers for raw documents

use crate::storage::traits::{StorageError, StorageResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

pub fn compress(raw: &str) -> StorageResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Inflates a stored document; bad gzip or non-UTF-8 content is `Corrupt`
pub fn decompress(bytes: &[u8], id: &str) -> StorageResult<String> {
    let mut decoder = GzDecoder::new(bytes);
    let mut raw = String::new();
    decoder
        .read_to_string(&mut raw)
        .map_err(|e| StorageError::Corrupt(format!("raw document for '{}': {}", id, e)))?;
    Ok(raw)
}

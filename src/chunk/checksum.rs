//! CRC32 framing for persisted chunk records and level files
//!
//! Every record carries a trailing CRC32 (IEEE) over its populated bytes.
//! Slot padding past the populated length is never covered or read.

use crc32fast::Hasher;

use super::errors::{StorageError, StorageResult};

pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Appends the checksum of everything currently in `buf`.
pub fn seal(buf: &mut Vec<u8>) {
    let crc = compute_checksum(buf);
    buf.extend_from_slice(&crc.to_le_bytes());
}

/// Splits a sealed record into its payload, verifying the trailing checksum.
pub fn unseal<'a>(record: &'a [u8], what: &str) -> StorageResult<&'a [u8]> {
    if record.len() < 4 {
        return Err(StorageError::InvalidFormat(format!("{} shorter than its checksum", what)));
    }
    let (payload, tail) = record.split_at(record.len() - 4);
    let expected = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    if compute_checksum(payload) != expected {
        return Err(StorageError::Corruption(what.to_string()));
    }
    Ok(payload)
}

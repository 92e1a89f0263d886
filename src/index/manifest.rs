//! Persisted index metadata
//!
//! Three blobs sit next to the chunk slots:
//!
//! - `meta.json`: column, element type, sizes, row counts
//! - `levels.dat`: chunk, block and superblock records
//! - `tail.dat`: unindexed tail rows in append order
//!
//! `tail.dat` is a single sealed record:
//!
//! ```text
//! | magic "CDXTAIL1" | width u32 | count u32 | values[count] | coords[count] u64 | crc u32 |
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{IndexError, IndexResult};
use crate::chunk::{seal, unseal, ChunkData, StorageError};
use crate::hierarchy::BlockSizes;
use crate::types::{ElementType, IndexValue};

pub const META_BLOB: &str = "meta.json";
pub const LEVELS_BLOB: &str = "levels.dat";
pub const TAIL_BLOB: &str = "tail.dat";

/// Every blob an index writes next to its chunks
pub const INDEX_BLOBS: [&str; 3] = [META_BLOB, LEVELS_BLOB, TAIL_BLOB];

pub const MANIFEST_VERSION: u32 = 1;

const TAIL_MAGIC: &[u8; 8] = b"CDXTAIL1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format_version: u32,
    pub column: String,
    pub element_type: ElementType,
    pub block_sizes: BlockSizes,
    pub optlevel: u8,
    pub auto_fold: bool,
    /// Rows in the sorted hierarchy
    pub indexed_rows: u64,
    pub tail_rows: u64,
    pub dirty: bool,
}

impl IndexMeta {
    pub fn to_json(&self) -> IndexResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> IndexResult<Self> {
        let meta: IndexMeta = serde_json::from_slice(bytes)?;
        if meta.format_version != MANIFEST_VERSION {
            return Err(IndexError::Manifest(format!(
                "unsupported manifest version {}",
                meta.format_version
            )));
        }
        Ok(meta)
    }

    pub fn total_rows(&self) -> u64 {
        self.indexed_rows + self.tail_rows
    }
}

/// Reads `meta.json` from an index directory without opening its chunks.
pub fn read_meta(dir: &Path) -> IndexResult<IndexMeta> {
    let path = dir.join(META_BLOB);
    let bytes = fs::read(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => IndexError::Manifest(format!("no index at {}", dir.display())),
        _ => StorageError::io(format!("read {}", path.display()), e).into(),
    })?;
    IndexMeta::from_json(&bytes)
}

pub fn encode_tail<T: IndexValue>(tail: &ChunkData<T>, width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + tail.len() * (width + 8) + 4);
    out.extend_from_slice(TAIL_MAGIC);
    out.extend_from_slice(&(width as u32).to_le_bytes());
    out.extend_from_slice(&(tail.len() as u32).to_le_bytes());
    for v in &tail.values {
        v.encode(width, &mut out);
    }
    for c in &tail.coords {
        out.extend_from_slice(&c.to_le_bytes());
    }
    seal(&mut out);
    out
}

pub fn decode_tail<T: IndexValue>(bytes: &[u8], width: usize) -> IndexResult<ChunkData<T>> {
    let payload = unseal(bytes, "tail file")?;
    if payload.len() < 16 || &payload[0..8] != TAIL_MAGIC {
        return Err(StorageError::InvalidFormat("bad tail file header".into()).into());
    }
    let stored_width = u32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]]) as usize;
    let count = u32::from_le_bytes([payload[12], payload[13], payload[14], payload[15]]) as usize;
    if stored_width != width || payload.len() != 16 + count * (width + 8) {
        return Err(StorageError::InvalidFormat(format!(
            "tail file of {} bytes does not hold {} rows of width {}",
            payload.len(),
            count,
            width
        ))
        .into());
    }

    let mut tail = ChunkData::with_capacity(count);
    let coords_at = 16 + count * width;
    for i in 0..count {
        let at = 16 + i * width;
        let mut c = [0u8; 8];
        c.copy_from_slice(&payload[coords_at + i * 8..coords_at + i * 8 + 8]);
        tail.push(T::decode(&payload[at..at + width]), u64::from_le_bytes(c));
    }
    Ok(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_json() {
        let meta = IndexMeta {
            format_version: MANIFEST_VERSION,
            column: "var1".into(),
            element_type: ElementType::String { itemsize: 4 },
            block_sizes: BlockSizes::small(),
            optlevel: 6,
            auto_fold: false,
            indexed_rows: 40,
            tail_rows: 3,
            dirty: true,
        };
        let back = IndexMeta::from_json(&meta.to_json().unwrap()).unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.total_rows(), 43);
    }

    #[test]
    fn test_wrong_manifest_version() {
        let json = br#"{"format_version": 99, "column": "c", "element_type": {"kind": "int8"},
            "block_sizes": {"superblock_size": 16, "block_size": 8, "chunk_size": 4},
            "optlevel": 0, "auto_fold": true, "indexed_rows": 0, "tail_rows": 0, "dirty": false}"#;
        assert_eq!(IndexMeta::from_json(json).unwrap_err().code(), "COLDEX_INDEX_MANIFEST");
    }

    #[test]
    fn test_tail_keeps_append_order() {
        let tail = ChunkData::new(vec![9u16, 2, 7], vec![30, 31, 32]);
        let bytes = encode_tail(&tail, 2);
        assert_eq!(decode_tail::<u16>(&bytes, 2).unwrap(), tail);

        let mut bad = bytes.clone();
        bad[17] ^= 1;
        assert_eq!(decode_tail::<u16>(&bad, 2).unwrap_err().code(), "COLDEX_STORAGE_CORRUPTION");
    }

    #[test]
    fn test_read_meta_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_meta(&dir.path().join("absent")).unwrap_err();
        assert_eq!(err.code(), "COLDEX_INDEX_MANIFEST");
    }
}

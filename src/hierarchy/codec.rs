//! `levels.dat` layout
//!
//! ```text
//! header: | magic "CDXLEVEL" | version u32 | width u32 | nrows u64
//!         | chunks u32 | blocks u32 | superblocks u32 | crc u32 |
//! chunk:  | slot u32 | generation u32 | len u32 | min | max | crc u32 |
//! node:   | first_child u32 | child_count u32 | min | max | crc u32 |
//! ```
//!
//! One array of fixed-width records per level. Node levels are recomputed
//! on load and must match what was stored.

use super::bounds::Bounds;
use super::sizing::BlockSizes;
use super::tree::{ChunkMeta, Hierarchy, LevelNode};
use crate::chunk::{seal, unseal, ChunkRef, StorageError};
use crate::index::IndexResult;
use crate::types::IndexValue;

const MAGIC: &[u8; 8] = b"CDXLEVEL";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 4 + 8 + 4 + 4 + 4 + 4;

fn chunk_record_len(width: usize) -> usize {
    12 + 2 * width + 4
}

fn node_record_len(width: usize) -> usize {
    8 + 2 * width + 4
}

pub fn encode_levels<T: IndexValue>(hierarchy: &Hierarchy<T>, width: usize) -> Vec<u8> {
    let chunks = hierarchy.chunks();
    let blocks = hierarchy.blocks();
    let superblocks = hierarchy.superblocks();

    let mut out = Vec::with_capacity(
        HEADER_LEN
            + chunks.len() * chunk_record_len(width)
            + (blocks.len() + superblocks.len()) * node_record_len(width),
    );
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&VERSION.to_le_bytes());
    header.extend_from_slice(&(width as u32).to_le_bytes());
    header.extend_from_slice(&hierarchy.nrows().to_le_bytes());
    header.extend_from_slice(&(chunks.len() as u32).to_le_bytes());
    header.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
    header.extend_from_slice(&(superblocks.len() as u32).to_le_bytes());
    seal(&mut header);
    out.extend_from_slice(&header);

    for meta in chunks {
        let mut rec = Vec::with_capacity(chunk_record_len(width));
        rec.extend_from_slice(&meta.chunk.slot.to_le_bytes());
        rec.extend_from_slice(&meta.chunk.generation.to_le_bytes());
        rec.extend_from_slice(&(meta.len as u32).to_le_bytes());
        meta.bounds.min.encode(width, &mut rec);
        meta.bounds.max.encode(width, &mut rec);
        seal(&mut rec);
        out.extend_from_slice(&rec);
    }
    for node in blocks.iter().chain(superblocks) {
        let mut rec = Vec::with_capacity(node_record_len(width));
        rec.extend_from_slice(&(node.first_child as u32).to_le_bytes());
        rec.extend_from_slice(&(node.child_count as u32).to_le_bytes());
        node.bounds.min.encode(width, &mut rec);
        node.bounds.max.encode(width, &mut rec);
        seal(&mut rec);
        out.extend_from_slice(&rec);
    }
    out
}

pub fn decode_levels<T: IndexValue>(
    bytes: &[u8],
    sizes: BlockSizes,
    width: usize,
) -> IndexResult<Hierarchy<T>> {
    if bytes.len() < HEADER_LEN {
        return Err(StorageError::InvalidFormat("level file shorter than its header".into()).into());
    }
    let header = unseal(&bytes[..HEADER_LEN], "level file header")?;
    if &header[0..8] != MAGIC {
        return Err(StorageError::InvalidFormat("bad level file magic".into()).into());
    }
    let version = read_u32(header, 8);
    if version != VERSION {
        return Err(StorageError::InvalidFormat(format!("unsupported level file version {}", version)).into());
    }
    let stored_width = read_u32(header, 12) as usize;
    if stored_width != width {
        return Err(StorageError::InvalidFormat(format!(
            "level file width {} does not match column width {}",
            stored_width, width
        ))
        .into());
    }
    let nrows = read_u64(header, 16);
    let nchunks = read_u32(header, 24) as usize;
    let nblocks = read_u32(header, 28) as usize;
    let nsuper = read_u32(header, 32) as usize;

    let expected = HEADER_LEN + nchunks * chunk_record_len(width) + (nblocks + nsuper) * node_record_len(width);
    if bytes.len() != expected {
        return Err(StorageError::InvalidFormat(format!(
            "level file is {} bytes, expected {}",
            bytes.len(),
            expected
        ))
        .into());
    }

    let mut pos = HEADER_LEN;
    let mut chunks = Vec::with_capacity(nchunks);
    for i in 0..nchunks {
        let rec_len = chunk_record_len(width);
        let rec = unseal(&bytes[pos..pos + rec_len], &format!("level record for chunk {}", i))?;
        pos += rec_len;
        chunks.push(ChunkMeta {
            chunk: ChunkRef::new(read_u32(rec, 0), read_u32(rec, 4)),
            len: read_u32(rec, 8) as usize,
            bounds: Bounds::new(T::decode(&rec[12..12 + width]), T::decode(&rec[12 + width..12 + 2 * width])),
        });
    }
    let mut nodes = Vec::with_capacity(nblocks + nsuper);
    for i in 0..nblocks + nsuper {
        let rec_len = node_record_len(width);
        let rec = unseal(&bytes[pos..pos + rec_len], &format!("level record for node {}", i))?;
        pos += rec_len;
        nodes.push(LevelNode {
            first_child: read_u32(rec, 0) as usize,
            child_count: read_u32(rec, 4) as usize,
            bounds: Bounds::new(T::decode(&rec[8..8 + width]), T::decode(&rec[8 + width..8 + 2 * width])),
        });
    }

    let hierarchy = Hierarchy::from_parts(sizes, chunks, nrows);
    let (stored_blocks, stored_super) = nodes.split_at(nblocks);
    if !same_nodes(hierarchy.blocks(), stored_blocks) || !same_nodes(hierarchy.superblocks(), stored_super) {
        return Err(StorageError::Corruption("stored level bounds disagree with chunk bounds".into()).into());
    }
    Ok(hierarchy)
}

fn same_nodes<T: IndexValue>(a: &[LevelNode<T>], b: &[LevelNode<T>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.first_child == y.first_child && x.child_count == y.child_count && x.bounds.same_as(&y.bounds)
        })
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MemoryChunkStore;
    use crate::types::FixedString;

    #[test]
    fn test_levels_reload_with_bounds() {
        let sizes = BlockSizes::small();
        let mut store = MemoryChunkStore::new(sizes.chunk_size);
        let values: Vec<i16> = (0..37).map(|i| ((i * 7919) % 101) as i16 - 50).collect();
        let coords = (0..37).collect();
        let h = Hierarchy::build(sizes, values, coords, &mut store).unwrap();

        let bytes = encode_levels(&h, 2);
        let back: Hierarchy<i16> = decode_levels(&bytes, sizes, 2).unwrap();
        assert_eq!(back.nrows(), 37);
        assert_eq!(back.chunks().len(), h.chunks().len());
        for (a, b) in back.chunks().iter().zip(h.chunks()) {
            assert_eq!(a.chunk, b.chunk);
            assert_eq!(a.len, b.len);
            assert!(a.bounds.same_as(&b.bounds));
        }
        back.verify(&store).unwrap();
    }

    #[test]
    fn test_string_levels() {
        let sizes = BlockSizes::small();
        let mut store = MemoryChunkStore::new(sizes.chunk_size);
        let values: Vec<FixedString> = ["pear", "fig", "apple", "kiwi", "plum"]
            .iter()
            .map(|s| FixedString::from(*s))
            .collect();
        let h = Hierarchy::build(sizes, values, (0..5).collect(), &mut store).unwrap();
        let back: Hierarchy<FixedString> = decode_levels(&encode_levels(&h, 5), sizes, 5).unwrap();
        assert_eq!(back.root().unwrap().min, FixedString::from("apple"));
        assert_eq!(back.root().unwrap().max, FixedString::from("plum"));
    }

    #[test]
    fn test_corrupted_record_detected() {
        let sizes = BlockSizes::small();
        let mut store = MemoryChunkStore::new(sizes.chunk_size);
        let h = Hierarchy::build(sizes, (0..20i32).collect(), (0..20).collect(), &mut store).unwrap();
        let mut bytes = encode_levels(&h, 4);
        bytes[HEADER_LEN + 13] ^= 0xff;
        let err = decode_levels::<i32>(&bytes, sizes, 4).unwrap_err();
        assert_eq!(err.code(), "COLDEX_STORAGE_CORRUPTION");

        let err = decode_levels::<i32>(&bytes[..HEADER_LEN + 3], sizes, 4).unwrap_err();
        assert_eq!(err.code(), "COLDEX_STORAGE_INVALID_FORMAT");
    }
}

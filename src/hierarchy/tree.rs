//! The sorted level hierarchy
//!
//! Level 0 is an ordered list of chunks. Blocks group `chunks_per_block`
//! consecutive chunks, superblocks group `blocks_per_superblock` consecutive
//! blocks, and the root covers everything. Upper levels hold only bounds and
//! child ranges; raw values live in the chunk store.
//!
//! # Invariants
//!
//! - Chunk contents are sorted and chunk bounds are tight
//! - Parent bounds are the union of their children's bounds
//! - No coordinate appears in more than one chunk
//! - Every chunk holds at least one entry; only the last may be partial

use std::cmp::Ordering;
use std::collections::HashSet;

use super::bounds::Bounds;
use super::sizing::BlockSizes;
use crate::chunk::{ChunkData, ChunkRef, ChunkStore};
use crate::index::{IndexError, IndexResult};
use crate::types::IndexValue;

/// Level-0 entry: where a chunk lives and what it spans.
#[derive(Debug, Clone)]
pub struct ChunkMeta<T> {
    pub chunk: ChunkRef,
    pub len: usize,
    pub bounds: Bounds<T>,
}

/// Block or superblock: aggregate bounds over a contiguous child range.
#[derive(Debug, Clone)]
pub struct LevelNode<T> {
    pub bounds: Bounds<T>,
    pub first_child: usize,
    pub child_count: usize,
}

impl<T> LevelNode<T> {
    pub fn children(&self) -> std::ops::Range<usize> {
        self.first_child..self.first_child + self.child_count
    }
}

/// Overlap between chunk bounds, summed over all chunk pairs.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct OverlapStats {
    pub overlapping_pairs: usize,
    pub total_overlap: f64,
}

/// What a fold did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FoldSummary {
    pub rows_folded: usize,
    pub chunks_rewritten: usize,
    pub chunks_appended: usize,
}

#[derive(Debug, Clone)]
pub struct Hierarchy<T> {
    sizes: BlockSizes,
    chunks: Vec<ChunkMeta<T>>,
    blocks: Vec<LevelNode<T>>,
    superblocks: Vec<LevelNode<T>>,
    root: Option<Bounds<T>>,
    nrows: u64,
}

impl<T: IndexValue> Hierarchy<T> {
    pub fn empty(sizes: BlockSizes) -> Self {
        Self {
            sizes,
            chunks: Vec::new(),
            blocks: Vec::new(),
            superblocks: Vec::new(),
            root: None,
            nrows: 0,
        }
    }

    /// Partitions rows into chunks in their given order, sorts each chunk,
    /// writes it to the store and derives the upper levels.
    pub fn build(
        sizes: BlockSizes,
        values: Vec<T>,
        coords: Vec<u64>,
        store: &mut dyn ChunkStore<T>,
    ) -> IndexResult<Self> {
        sizes.validate()?;
        if values.len() != coords.len() {
            return Err(IndexError::Invariant(format!(
                "{} values but {} coordinates",
                values.len(),
                coords.len()
            )));
        }

        let mut hierarchy = Self::empty(sizes);
        let mut values = values.into_iter();
        let mut coords = coords.into_iter();
        loop {
            let vals: Vec<T> = values.by_ref().take(sizes.chunk_size).collect();
            if vals.is_empty() {
                break;
            }
            let crds: Vec<u64> = coords.by_ref().take(vals.len()).collect();
            let mut chunk = ChunkData::new(vals, crds);
            chunk.sort();
            let chunk_ref = store.append_chunk(&chunk)?;
            hierarchy.push_chunk(chunk_ref, &chunk);
        }
        hierarchy.rebuild_levels();
        Ok(hierarchy)
    }

    /// Reassembles a hierarchy from persisted chunk records.
    pub(crate) fn from_parts(sizes: BlockSizes, chunks: Vec<ChunkMeta<T>>, nrows: u64) -> Self {
        let mut hierarchy = Self::empty(sizes);
        hierarchy.chunks = chunks;
        hierarchy.nrows = nrows;
        hierarchy.rebuild_levels();
        hierarchy
    }

    fn push_chunk(&mut self, chunk: ChunkRef, data: &ChunkData<T>) {
        if let Some((min, max)) = data.min_max() {
            self.chunks.push(ChunkMeta {
                chunk,
                len: data.len(),
                bounds: Bounds::new(min.clone(), max.clone()),
            });
            self.nrows += data.len() as u64;
        }
    }

    /// Merges unindexed tail rows into the hierarchy.
    ///
    /// A partial last chunk is reopened: its entries join the tail, and its
    /// slot is rewritten with the first new chunk. The rewrite replaces the
    /// slot's contents and generation, so nothing from the old chunk can be
    /// read back through the new reference.
    pub fn fold(&mut self, tail: ChunkData<T>, store: &mut dyn ChunkStore<T>) -> IndexResult<FoldSummary> {
        let mut summary = FoldSummary {
            rows_folded: tail.len(),
            ..FoldSummary::default()
        };
        if tail.is_empty() {
            return Ok(summary);
        }

        let chunk_size = self.sizes.chunk_size;
        let mut pending = ChunkData::with_capacity(tail.len() + chunk_size);
        let mut reuse = None;
        // The partial chunk stays in place until its slot has been read back
        if let Some(last) = self.chunks.last().filter(|last| last.len < chunk_size).cloned() {
            let data = store.read_chunk(last.chunk)?;
            if data.len() != last.len {
                return Err(IndexError::Invariant(format!(
                    "chunk slot {} holds {} entries, expected {}",
                    last.chunk.slot,
                    data.len(),
                    last.len
                )));
            }
            self.chunks.pop();
            self.nrows -= last.len as u64;
            pending.values.extend(data.values);
            pending.coords.extend(data.coords);
            reuse = Some(last.chunk);
        }
        pending.values.extend(tail.values);
        pending.coords.extend(tail.coords);

        while !pending.is_empty() {
            let rest = pending.split_off(pending.len().min(chunk_size));
            let mut chunk = std::mem::replace(&mut pending, rest);
            chunk.sort();
            let chunk_ref = match reuse.take() {
                Some(old) => {
                    summary.chunks_rewritten += 1;
                    store.rewrite_chunk(old, &chunk)?
                }
                None => {
                    summary.chunks_appended += 1;
                    store.append_chunk(&chunk)?
                }
            };
            self.push_chunk(chunk_ref, &chunk);
        }

        self.rebuild_levels();
        Ok(summary)
    }

    /// Recomputes block, superblock and root bounds from the chunk level.
    pub fn rebuild_levels(&mut self) {
        self.blocks = group_level(
            self.chunks.iter().map(|c| &c.bounds),
            self.sizes.chunks_per_block(),
        );
        self.superblocks = group_level(
            self.blocks.iter().map(|b| &b.bounds),
            self.sizes.blocks_per_superblock(),
        );
        self.root = Bounds::union_all(self.superblocks.iter().map(|s| &s.bounds));
    }

    pub(crate) fn replace_chunk(&mut self, position: usize, chunk: ChunkRef, data: &ChunkData<T>) {
        if let Some((min, max)) = data.min_max() {
            let meta = &mut self.chunks[position];
            meta.chunk = chunk;
            meta.len = data.len();
            meta.bounds = Bounds::new(min.clone(), max.clone());
        }
    }

    pub fn sizes(&self) -> BlockSizes {
        self.sizes
    }

    pub fn chunks(&self) -> &[ChunkMeta<T>] {
        &self.chunks
    }

    pub fn blocks(&self) -> &[LevelNode<T>] {
        &self.blocks
    }

    pub fn superblocks(&self) -> &[LevelNode<T>] {
        &self.superblocks
    }

    pub fn root(&self) -> Option<&Bounds<T>> {
        self.root.as_ref()
    }

    /// Rows held by the hierarchy
    pub fn nrows(&self) -> u64 {
        self.nrows
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Pairwise overlap of chunk bounds.
    pub fn overlap(&self) -> OverlapStats {
        let mut order: Vec<&Bounds<T>> = self.chunks.iter().map(|c| &c.bounds).collect();
        order.sort_by(|a, b| a.min.total_cmp(&b.min));

        let mut stats = OverlapStats::default();
        for (i, a) in order.iter().enumerate() {
            for b in &order[i + 1..] {
                if b.min.total_cmp(&a.max) != Ordering::Less {
                    break;
                }
                if a.overlaps(b) {
                    stats.overlapping_pairs += 1;
                    stats.total_overlap += a.overlap_amount(b);
                }
            }
        }
        stats
    }

    /// Checks every structural invariant against the stored chunks and
    /// returns the coordinates the hierarchy holds.
    pub fn verify(&self, store: &dyn ChunkStore<T>) -> IndexResult<HashSet<u64>> {
        let mut seen = HashSet::with_capacity(self.nrows as usize);
        let mut total = 0u64;
        for (i, meta) in self.chunks.iter().enumerate() {
            let data = store.read_chunk(meta.chunk)?;
            if data.len() != meta.len || data.is_empty() {
                return Err(IndexError::Invariant(format!(
                    "chunk {} holds {} entries, metadata says {}",
                    i,
                    data.len(),
                    meta.len
                )));
            }
            if data.len() > self.sizes.chunk_size
                || (data.len() < self.sizes.chunk_size && i + 1 != self.chunks.len())
            {
                return Err(IndexError::Invariant(format!(
                    "chunk {} has {} entries with chunk size {}",
                    i,
                    data.len(),
                    self.sizes.chunk_size
                )));
            }
            if !data.is_sorted() {
                return Err(IndexError::Invariant(format!("chunk {} is not sorted", i)));
            }
            if let Some((min, max)) = data.min_max() {
                let tight = Bounds::new(min.clone(), max.clone());
                if !tight.same_as(&meta.bounds) {
                    return Err(IndexError::Invariant(format!("chunk {} bounds are not tight", i)));
                }
            }
            for c in &data.coords {
                if !seen.insert(*c) {
                    return Err(IndexError::Invariant(format!(
                        "coordinate {} appears in more than one chunk",
                        c
                    )));
                }
            }
            total += data.len() as u64;
        }
        if total != self.nrows {
            return Err(IndexError::Invariant(format!(
                "hierarchy holds {} rows, expected {}",
                total, self.nrows
            )));
        }

        let expected_blocks = group_level(
            self.chunks.iter().map(|c| &c.bounds),
            self.sizes.chunks_per_block(),
        );
        check_level("block", &self.blocks, &expected_blocks)?;
        let expected_superblocks = group_level(
            self.blocks.iter().map(|b| &b.bounds),
            self.sizes.blocks_per_superblock(),
        );
        check_level("superblock", &self.superblocks, &expected_superblocks)?;
        let root = Bounds::union_all(self.superblocks.iter().map(|s| &s.bounds));
        let root_ok = match (&root, &self.root) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        };
        if !root_ok {
            return Err(IndexError::Invariant("root bounds do not cover the superblocks".into()));
        }
        Ok(seen)
    }
}

fn group_level<'a, T: IndexValue>(
    children: impl Iterator<Item = &'a Bounds<T>>,
    fanout: usize,
) -> Vec<LevelNode<T>> {
    let children: Vec<&Bounds<T>> = children.collect();
    children
        .chunks(fanout.max(1))
        .enumerate()
        .filter_map(|(i, group)| {
            Bounds::union_all(group.iter().copied()).map(|bounds| LevelNode {
                bounds,
                first_child: i * fanout.max(1),
                child_count: group.len(),
            })
        })
        .collect()
}

fn check_level<T: IndexValue>(
    name: &str,
    actual: &[LevelNode<T>],
    expected: &[LevelNode<T>],
) -> IndexResult<()> {
    if actual.len() != expected.len() {
        return Err(IndexError::Invariant(format!(
            "{} level has {} nodes, expected {}",
            name,
            actual.len(),
            expected.len()
        )));
    }
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if a.first_child != e.first_child || a.child_count != e.child_count {
            return Err(IndexError::Invariant(format!("{} {} has wrong children", name, i)));
        }
        if !a.bounds.same_as(&e.bounds) {
            return Err(IndexError::Invariant(format!(
                "{} {} bounds are not the union of its children",
                name, i
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MemoryChunkStore;

    fn build(values: Vec<i32>) -> (Hierarchy<i32>, MemoryChunkStore<i32>) {
        let sizes = BlockSizes::small();
        let mut store = MemoryChunkStore::new(sizes.chunk_size);
        let coords = (0..values.len() as u64).collect();
        let h = Hierarchy::build(sizes, values, coords, &mut store).unwrap();
        (h, store)
    }

    #[test]
    fn test_empty_build() {
        let (h, store) = build(vec![]);
        assert!(h.is_empty());
        assert!(h.root().is_none());
        assert!(h.blocks().is_empty());
        assert!(h.verify(&store).unwrap().is_empty());
    }

    #[test]
    fn test_levels_follow_fanout() {
        let (h, store) = build((0..33).rev().collect());
        // 33 rows / 4 per chunk = 9 chunks (last partial), 5 blocks, 3 superblocks
        assert_eq!(h.chunks().len(), 9);
        assert_eq!(h.chunks()[8].len, 1);
        assert_eq!(h.blocks().len(), 5);
        assert_eq!(h.superblocks().len(), 3);
        assert_eq!(h.superblocks()[2].children(), 4..5);
        let root = h.root().unwrap();
        assert_eq!((root.min, root.max), (0, 32));
        assert_eq!(h.verify(&store).unwrap().len(), 33);
    }

    #[test]
    fn test_chunks_sorted_with_tight_bounds() {
        let (h, store) = build(vec![9, 3, 7, 1, 4, 4, 8, 2]);
        let first = store.read_chunk(h.chunks()[0].chunk).unwrap();
        assert_eq!(first.values, vec![1, 3, 7, 9]);
        assert_eq!(first.coords, vec![3, 1, 2, 0]);
        assert_eq!((h.chunks()[1].bounds.min, h.chunks()[1].bounds.max), (2, 8));
    }

    #[test]
    fn test_fold_reopens_partial_chunk() {
        let (mut h, mut store) = build(vec![5, 6, 7, 8, 1, 2]);
        let partial = h.chunks()[1].chunk;

        let tail = ChunkData::new(vec![9, 0, 3], vec![6, 7, 8]);
        let summary = h.fold(tail, &mut store).unwrap();
        assert_eq!(summary.chunks_rewritten, 1);
        assert_eq!(summary.chunks_appended, 1);
        assert_eq!(h.nrows(), 9);

        let reopened = &h.chunks()[1];
        assert_eq!(reopened.chunk.slot, partial.slot);
        assert_ne!(reopened.chunk.generation, partial.generation);
        assert_eq!(reopened.len, 4);
        assert_eq!(h.chunks()[2].len, 1);
        assert_eq!(h.verify(&store).unwrap().len(), 9);
    }

    #[test]
    fn test_overlap_stats() {
        let (disjoint, _) = build((0..16).collect());
        assert_eq!(disjoint.overlap(), OverlapStats::default());

        let (mixed, _) = build(vec![0, 10, 1, 11, 5, 6, 7, 8]);
        let stats = mixed.overlap();
        assert_eq!(stats.overlapping_pairs, 1);
        assert_eq!(stats.total_overlap, 3.0);
    }
}

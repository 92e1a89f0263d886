//! Top-down range search over the hierarchy
//!
//! root -> superblocks -> blocks -> chunks. A node is skipped as soon as its
//! bounds cannot intersect the range; surviving chunks are read and cut with
//! two binary searches.

use serde::Serialize;

use super::range::RangeSpec;
use crate::chunk::ChunkStore;
use crate::hierarchy::Hierarchy;
use crate::index::IndexResult;
use crate::types::IndexValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SearchStats {
    pub superblocks_visited: usize,
    pub superblocks_pruned: usize,
    pub blocks_visited: usize,
    pub blocks_pruned: usize,
    pub chunks_read: usize,
    pub chunks_pruned: usize,
    pub matches: usize,
}

/// Coordinates of every hierarchy entry whose value is in `range`.
///
/// Results come out in chunk order, which is not row order.
pub fn search<T: IndexValue>(
    hierarchy: &Hierarchy<T>,
    store: &dyn ChunkStore<T>,
    range: &RangeSpec,
) -> IndexResult<(Vec<u64>, SearchStats)> {
    let mut stats = SearchStats::default();
    let mut coords = Vec::new();

    let root_hit = hierarchy.root().map_or(false, |root| range.may_intersect(root));
    if !root_hit {
        stats.superblocks_pruned = hierarchy.superblocks().len();
        return Ok((coords, stats));
    }

    let blocks = hierarchy.blocks();
    let chunks = hierarchy.chunks();
    for superblock in hierarchy.superblocks() {
        if !range.may_intersect(&superblock.bounds) {
            stats.superblocks_pruned += 1;
            continue;
        }
        stats.superblocks_visited += 1;

        for block in &blocks[superblock.children()] {
            if !range.may_intersect(&block.bounds) {
                stats.blocks_pruned += 1;
                continue;
            }
            stats.blocks_visited += 1;

            for meta in &chunks[block.children()] {
                if !range.may_intersect(&meta.bounds) {
                    stats.chunks_pruned += 1;
                    continue;
                }
                let data = store.read_chunk(meta.chunk)?;
                stats.chunks_read += 1;
                // Only the tracked length is live
                let live = data.len().min(meta.len);
                let hit = range.match_range(&data.values[..live]);
                coords.extend_from_slice(&data.coords[hit]);
            }
        }
    }

    stats.matches = coords.len();
    tracing::debug!(
        range = %range,
        chunks_read = stats.chunks_read,
        chunks_pruned = stats.chunks_pruned,
        blocks_pruned = stats.blocks_pruned,
        superblocks_pruned = stats.superblocks_pruned,
        matches = stats.matches,
        "range search"
    );
    Ok((coords, stats))
}

//! Merge-split optimizer
//!
//! A pass collects every pair of sibling chunks whose bounds strictly
//! overlap, takes them largest overlap first (each chunk at most once per
//! pass), merges the two sorted runs and splits them back at the lower
//! chunk's length. The lower position receives the smaller values, so the
//! pair stops overlapping and chunk lengths per position never change.
//!
//! A merge-split never increases the overlap between either chunk and any
//! third chunk: the two inputs overlap, so together they cover the merged
//! range, and the two outputs split that range without overlapping each
//! other. Total overlap is therefore non-increasing.
//!
//! Passes repeat until one finds nothing to merge (a fixed point) or the
//! level's pass budget runs out. Running again on a fixed point is a no-op.

use std::cmp::Ordering;

use serde::Serialize;

use super::schedule::{MergeScope, Schedule};
use crate::chunk::{ChunkData, ChunkStore};
use crate::hierarchy::{BlockSizes, ChunkMeta, Hierarchy, OverlapStats};
use crate::index::{IndexError, IndexResult};
use crate::types::IndexValue;

/// Overlapping partners considered per chunk in one pass
const CANDIDATES_PER_CHUNK: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimizeSummary {
    pub level: u8,
    pub scope: MergeScope,
    pub passes: usize,
    pub merges: usize,
    /// Whether the last pass found nothing left to merge
    pub converged: bool,
    pub overlap_before: OverlapStats,
    pub overlap_after: OverlapStats,
}

/// Reorganizes chunk contents to reduce bound overlap.
///
/// Never changes the set of (value, coordinate) pairs.
pub fn optimize<T: IndexValue>(
    hierarchy: &mut Hierarchy<T>,
    store: &mut dyn ChunkStore<T>,
    level: u8,
) -> IndexResult<OptimizeSummary> {
    let schedule = Schedule::for_level(level)?;
    let overlap_before = hierarchy.overlap();
    let mut summary = OptimizeSummary {
        level,
        scope: schedule.scope,
        passes: 0,
        merges: 0,
        converged: schedule.max_passes == 0 || hierarchy.chunks().len() < 2,
        overlap_before,
        overlap_after: overlap_before,
    };
    if summary.converged {
        return Ok(summary);
    }

    for _ in 0..schedule.max_passes {
        let merges = run_pass(hierarchy, store, schedule.scope)?;
        summary.passes += 1;
        if merges == 0 {
            summary.converged = true;
            break;
        }
        summary.merges += merges;
    }

    hierarchy.rebuild_levels();
    summary.overlap_after = hierarchy.overlap();

    tracing::info!(
        level,
        passes = summary.passes,
        merges = summary.merges,
        converged = summary.converged,
        overlap_before = summary.overlap_before.total_overlap,
        overlap_after = summary.overlap_after.total_overlap,
        "optimized index"
    );
    Ok(summary)
}

fn group_len(sizes: BlockSizes, scope: MergeScope, nchunks: usize) -> usize {
    match scope {
        MergeScope::Block => sizes.chunks_per_block(),
        MergeScope::Superblock => sizes.chunks_per_block() * sizes.blocks_per_superblock(),
        MergeScope::Global => nchunks,
    }
    .max(1)
}

fn run_pass<T: IndexValue>(
    hierarchy: &mut Hierarchy<T>,
    store: &mut dyn ChunkStore<T>,
    scope: MergeScope,
) -> IndexResult<usize> {
    let nchunks = hierarchy.chunks().len();
    let group = group_len(hierarchy.sizes(), scope, nchunks);

    let mut pairs = Vec::new();
    for start in (0..nchunks).step_by(group) {
        let end = (start + group).min(nchunks);
        candidate_pairs(&hierarchy.chunks()[start..end], start, &mut pairs);
    }
    pairs.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then(a.lower.cmp(&b.lower))
            .then(a.upper.cmp(&b.upper))
    });

    let mut used = vec![false; nchunks];
    let mut merges = 0;
    for pair in pairs {
        if used[pair.lower] || used[pair.upper] {
            continue;
        }
        used[pair.lower] = true;
        used[pair.upper] = true;
        merge_split(hierarchy, store, pair.lower, pair.upper)?;
        merges += 1;
    }
    Ok(merges)
}

struct Candidate {
    lower: usize,
    upper: usize,
    amount: f64,
}

/// Sweeps the group in min order; a chunk's overlapping partners all start
/// before its max.
fn candidate_pairs<T: IndexValue>(group: &[ChunkMeta<T>], offset: usize, out: &mut Vec<Candidate>) {
    let mut order: Vec<usize> = (0..group.len()).collect();
    order.sort_by(|&a, &b| group[a].bounds.min.total_cmp(&group[b].bounds.min).then(a.cmp(&b)));

    for (i, &a) in order.iter().enumerate() {
        let mut found = 0;
        for &b in &order[i + 1..] {
            if found == CANDIDATES_PER_CHUNK
                || group[b].bounds.min.total_cmp(&group[a].bounds.max) != Ordering::Less
            {
                break;
            }
            if group[a].bounds.overlaps(&group[b].bounds) {
                out.push(Candidate {
                    lower: offset + a.min(b),
                    upper: offset + a.max(b),
                    amount: group[a].bounds.overlap_amount(&group[b].bounds),
                });
                found += 1;
            }
        }
    }
}

fn merge_split<T: IndexValue>(
    hierarchy: &mut Hierarchy<T>,
    store: &mut dyn ChunkStore<T>,
    lower: usize,
    upper: usize,
) -> IndexResult<()> {
    let (lower_meta, upper_meta) = {
        let chunks = hierarchy.chunks();
        (chunks[lower].clone(), chunks[upper].clone())
    };
    let a = store.read_chunk(lower_meta.chunk)?;
    let b = store.read_chunk(upper_meta.chunk)?;
    if a.len() != lower_meta.len || b.len() != upper_meta.len {
        return Err(IndexError::Invariant(format!(
            "chunks {} and {} disagree with their metadata lengths",
            lower, upper
        )));
    }

    let mut merged = ChunkData::merge(a, b);
    let high = merged.split_off(lower_meta.len);
    let lower_ref = store.rewrite_chunk(lower_meta.chunk, &merged)?;
    let upper_ref = store.rewrite_chunk(upper_meta.chunk, &high)?;
    hierarchy.replace_chunk(lower, lower_ref, &merged);
    hierarchy.replace_chunk(upper, upper_ref, &high);
    Ok(())
}

//! Optimizer Level Tests
//!
//! Tests for the 0-9 optimization levels:
//! - Results never depend on the level
//! - Overlap never grows, and higher scopes reach at least as low
//! - Re-running at a converged level changes nothing

use std::collections::BTreeSet;

use coldex::index::{ColumnIndex, IndexConfig, IndexLocation};
use coldex::optimizer::MergeScope;
use coldex::search::{Bound, RangeSpec};
use coldex::types::ElementType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Helper Functions
// =============================================================================

fn random_index(seed: u64, n: usize) -> (ColumnIndex<i32>, Vec<i32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let values: Vec<i32> = (0..n).map(|_| rng.gen_range(0..500)).collect();
    let config = IndexConfig::small().with_optlevel(0);
    let index = ColumnIndex::build("v", ElementType::Int32, values.clone(), &config, &IndexLocation::Memory).unwrap();
    (index, values)
}

/// Coordinate sets of every chunk, in chunk order
fn grouping(index: &ColumnIndex<i32>) -> Vec<BTreeSet<u64>> {
    index
        .hierarchy()
        .chunks()
        .iter()
        .map(|meta| {
            let data = index.store().read_chunk(meta.chunk).unwrap();
            data.coords.into_iter().collect()
        })
        .collect()
}

fn ranges() -> Vec<RangeSpec> {
    vec![
        RangeSpec::equal(250),
        RangeSpec::lt(17),
        RangeSpec::ge(480),
        RangeSpec::between(Bound::inclusive(100), Bound::exclusive(140)),
    ]
}

fn results(index: &ColumnIndex<i32>) -> Vec<Vec<u64>> {
    ranges()
        .iter()
        .map(|r| {
            let mut coords = index.search(r).unwrap();
            coords.sort_unstable();
            coords
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

/// Every level keeps results and never increases overlap.
#[test]
fn test_levels_preserve_results() {
    let (reference, _) = random_index(5, 301);
    let expected = results(&reference);
    let unoptimized = reference.hierarchy().overlap();

    for level in 0..=9u8 {
        let (mut index, _) = random_index(5, 301);
        let summary = index.optimize(level).unwrap();
        assert_eq!(summary.level, level);
        assert!(summary.overlap_after.total_overlap <= summary.overlap_before.total_overlap);
        assert!(summary.overlap_after.total_overlap <= unoptimized.total_overlap);
        assert_eq!(results(&index), expected, "level {}", level);
        index.verify().unwrap();
        if level == 0 {
            assert_eq!(summary.passes, 0);
            assert_eq!(summary.merges, 0);
        }
    }
}

/// The schedule widens scope with the level.
#[test]
fn test_level_scopes() {
    let (mut index, _) = random_index(6, 64);
    assert_eq!(index.optimize(2).unwrap().scope, MergeScope::Block);
    assert_eq!(index.optimize(5).unwrap().scope, MergeScope::Superblock);
    assert_eq!(index.optimize(8).unwrap().scope, MergeScope::Global);
    assert_eq!(index.optimize(10).unwrap_err().code(), "COLDEX_INDEX_INVALID_OPTLEVEL");
}

/// A global optimization reaches at least the overlap of a block-scoped one.
#[test]
fn test_global_scope_reduces_more() {
    let (mut block, _) = random_index(7, 121);
    let (mut global, _) = random_index(7, 121);
    let b = block.optimize(3).unwrap();
    let g = global.optimize(9).unwrap();
    assert!(g.converged);
    assert_eq!(g.overlap_after.overlapping_pairs, 0);
    assert!(g.overlap_after.total_overlap <= b.overlap_after.total_overlap);
}

/// Re-running a converged optimization is a no-op.
#[test]
fn test_converged_rerun_is_noop() {
    let (mut index, _) = random_index(8, 120);
    let first = index.optimize(9).unwrap();
    assert!(first.converged);
    let grouped = grouping(&index);

    let second = index.optimize(9).unwrap();
    assert_eq!(second.merges, 0);
    assert_eq!(second.overlap_after, first.overlap_after);
    assert_eq!(grouping(&index), grouped);
}

/// Re-running a capped level never makes overlap worse.
#[test]
fn test_capped_rerun_does_not_regress() {
    for level in 1..=8u8 {
        let (mut index, _) = random_index(9, 180);
        let first = index.optimize(level).unwrap();
        let second = index.optimize(level).unwrap();
        assert!(second.overlap_after.total_overlap <= first.overlap_after.total_overlap, "level {}", level);
    }
}

/// Optimizing only regroups pairs, leaving every chunk length in place.
#[test]
fn test_chunk_lengths_kept() {
    let (mut index, values) = random_index(10, 99);
    let lengths: Vec<usize> = index.hierarchy().chunks().iter().map(|c| c.len).collect();
    index.optimize(9).unwrap();
    let after: Vec<usize> = index.hierarchy().chunks().iter().map(|c| c.len).collect();
    assert_eq!(after, lengths);
    let coords: BTreeSet<u64> = grouping(&index).into_iter().flatten().collect();
    assert_eq!(coords, (0..values.len() as u64).collect());
}

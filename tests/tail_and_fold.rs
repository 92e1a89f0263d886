//! Unindexed Tail Tests
//!
//! Tests for rows appended after the bulk build:
//! - Searches see hierarchy and tail rows exactly once
//! - Folding moves tail rows into chunks without changing results
//! - Auto-fold triggers once the tail holds a full chunk
//! - Zero-row tables and indexes behave as empty, not as errors

use std::collections::HashSet;

use coldex::index::{ColumnIndex, IndexConfig, IndexLocation};
use coldex::planner::{Condition, RowWindow};
use coldex::search::{Bound, RangeSpec};
use coldex::table::{IndexedTable, Schema};
use coldex::types::{ElementType, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Helper Functions
// =============================================================================

fn random_values(rng: &mut StdRng, n: usize) -> Vec<i64> {
    (0..n).map(|_| rng.gen_range(-50..50)).collect()
}

fn expected(values: &[i64], range: &RangeSpec) -> Vec<u64> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| range.contains(*v))
        .map(|(i, _)| i as u64)
        .collect()
}

fn search_ranges() -> Vec<RangeSpec> {
    vec![
        RangeSpec::equal(0i64),
        RangeSpec::lt(-10i64),
        RangeSpec::ge(25i64),
        RangeSpec::between(Bound::exclusive(-5i64), Bound::inclusive(5i64)),
        RangeSpec::between(Bound::inclusive(10i64), Bound::exclusive(10i64)),
        RangeSpec::all(),
    ]
}

fn sorted(mut coords: Vec<u64>) -> Vec<u64> {
    coords.sort_unstable();
    coords
}

// =============================================================================
// Tail Tests
// =============================================================================

/// N appended rows are found by a linear scan of exactly those rows.
#[test]
fn test_tail_rows_searched_once() {
    let mut rng = StdRng::seed_from_u64(21);
    let base = random_values(&mut rng, 77);
    let extra = random_values(&mut rng, 13);
    let mut index =
        ColumnIndex::build("v", ElementType::Int64, base.clone(), &IndexConfig::small(), &IndexLocation::Memory).unwrap();
    assert_eq!(index.append(extra.clone()).unwrap(), None);
    assert_eq!(index.tail_len(), 13);
    assert!(index.is_dirty());

    let all: Vec<i64> = base.iter().chain(&extra).copied().collect();
    for range in search_ranges() {
        let outcome = index.search_with_stats(&range).unwrap();
        let tail_expected = extra.iter().filter(|v| range.contains(*v)).count();
        assert_eq!(outcome.tail_matches, tail_expected, "{}", range);

        let unique: HashSet<u64> = outcome.coords.iter().copied().collect();
        assert_eq!(unique.len(), outcome.coords.len(), "duplicates for {}", range);
        assert_eq!(sorted(outcome.coords), expected(&all, &range), "{}", range);
    }
    index.verify().unwrap();
}

/// Folding leaves every search result unchanged.
#[test]
fn test_fold_preserves_results() {
    let mut rng = StdRng::seed_from_u64(22);
    let mut all = random_values(&mut rng, 33);
    let mut index =
        ColumnIndex::build("v", ElementType::Int64, all.clone(), &IndexConfig::small(), &IndexLocation::Memory).unwrap();

    for batch in [1usize, 2, 3, 5, 8, 13, 21] {
        let extra = random_values(&mut rng, batch);
        index.append(extra.clone()).unwrap();
        all.extend(extra);
        let before: Vec<Vec<u64>> = search_ranges().iter().map(|r| sorted(index.search(r).unwrap())).collect();

        let report = index.fold().unwrap();
        assert_eq!(report.rows_folded, batch);
        assert!(!index.is_dirty());
        assert_eq!(index.indexed_rows(), all.len() as u64);
        index.verify().unwrap();

        for (range, prior) in search_ranges().iter().zip(before) {
            let after = sorted(index.search(range).unwrap());
            assert_eq!(after, prior, "{}", range);
            assert_eq!(after, expected(&all, range));
        }
    }
}

/// With auto-fold, the tail never reaches a full chunk.
#[test]
fn test_auto_fold_at_chunk_size() {
    let config = IndexConfig::small().with_auto_fold(true);
    let mut index = ColumnIndex::build("v", ElementType::Int64, vec![1i64, 2, 3, 4], &config, &IndexLocation::Memory).unwrap();
    let chunk = index.block_sizes().chunk_size;

    assert!(index.append(vec![9; chunk - 1]).unwrap().is_none());
    assert_eq!(index.tail_len(), chunk - 1);
    let report = index.append(vec![9]).unwrap().expect("full tail folds");
    assert_eq!(report.rows_folded, chunk);
    assert_eq!(index.tail_len(), 0);
    assert_eq!(sorted(index.search(&RangeSpec::equal(9i64)).unwrap()), (4..4 + chunk as u64).collect::<Vec<_>>());
}

/// Tables feed every index tail on append.
#[test]
fn test_table_append_feeds_all_indexes() {
    let schema = Schema::default()
        .with_column("a", ElementType::Int64)
        .with_column("b", ElementType::Float32);
    let mut table = IndexedTable::new(schema).with_config(IndexConfig::small());
    let rows = |range: std::ops::Range<i64>| -> Vec<Vec<Value>> {
        range.map(|i| vec![Value::Int64(i % 7), Value::Float32(i as f32 / 2.0)]).collect()
    };
    table.append_rows(&rows(0..30)).unwrap();
    table.create_index("a").unwrap();
    table.create_index("b").unwrap();
    table.append_rows(&rows(30..45)).unwrap();

    assert_eq!(table.index_stats("a").unwrap().tail_rows, 15);
    assert_eq!(table.index_stats("b").unwrap().tail_rows, 15);
    let equal_3 = table.where_list(&Condition::equal("a", 3), RowWindow::all()).unwrap();
    assert_eq!(equal_3, (0..45).filter(|i| i % 7 == 3).collect::<Vec<u64>>());
    let b_high = table.where_list(&Condition::ge("b", 20.0), RowWindow::all()).unwrap();
    assert_eq!(b_high, (40..45).collect::<Vec<u64>>());

    table.flush_indexes().unwrap();
    assert_eq!(table.where_list(&Condition::equal("a", 3), RowWindow::all()).unwrap(), equal_3);
    assert_eq!(table.flush_indexes().unwrap().len(), 0);
}

// =============================================================================
// Degenerate Inputs
// =============================================================================

/// A zero-row index is empty and answers every search with nothing.
#[test]
fn test_zero_row_index() {
    let index = ColumnIndex::<f64>::build("f", ElementType::Float64, Vec::new(), &IndexConfig::default(), &IndexLocation::Memory)
        .unwrap();
    assert!(index.hierarchy().is_empty());
    assert!(index.hierarchy().root().is_none());
    assert_eq!(index.nrows(), 0);
    for range in [RangeSpec::all(), RangeSpec::equal(0.0), RangeSpec::lt(f64::INFINITY)] {
        assert!(index.search(&range).unwrap().is_empty());
    }
    index.verify().unwrap();
    let stats = index.stats();
    assert_eq!(stats.chunks, 0);
    assert_eq!(stats.superblocks, 0);
}

/// Zero-row tables plan, scan and search without error.
#[test]
fn test_zero_row_table() {
    let schema = Schema::default().with_column("s", ElementType::String { itemsize: 8 });
    let mut table = IndexedTable::new(schema);
    assert_eq!(table.create_index("s").unwrap(), 0);
    let cond = Condition::ge("s", "a").and(Condition::lt("s", "z"));
    assert!(table.will_query_use_indexing(&cond).unwrap());
    assert!(table.where_list(&cond, RowWindow::all()).unwrap().is_empty());
    assert!(table.where_list(&cond, RowWindow::new(Some(-3), Some(-1), Some(2))).unwrap().is_empty());

    table.append_rows(&[vec![Value::str("m")]]).unwrap();
    assert_eq!(table.where_list(&cond, RowWindow::all()).unwrap(), vec![0]);
}

/// Empty bounds give an empty result, not an error.
#[test]
fn test_inverted_bounds_empty() {
    let index =
        ColumnIndex::build("v", ElementType::Int64, (0i64..50).collect(), &IndexConfig::small(), &IndexLocation::Memory).unwrap();
    let inverted = RangeSpec::between(Bound::inclusive(30i64), Bound::inclusive(20i64));
    assert!(index.search(&inverted).unwrap().is_empty());
}

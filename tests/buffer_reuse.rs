//! Buffer Reuse Regression Tests
//!
//! Chunks rewritten by folds and merges must never expose entries left over
//! from what a slot held before. Every equality hit has to carry the
//! searched value, and every row has to be found by its own value.

use coldex::index::{ColumnIndex, IndexConfig, IndexLocation};
use coldex::planner::{Condition, RowWindow};
use coldex::search::RangeSpec;
use coldex::table::{IndexedTable, RowSource, Schema};
use coldex::types::{ElementType, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

const NELEM: usize = 1221;

// =============================================================================
// Helper Functions
// =============================================================================

fn random_ids(seed: u64) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..NELEM).map(|_| rng.gen_range(0..i16::MAX)).collect()
}

fn table_of(ids: &[i16], config: IndexConfig) -> IndexedTable {
    let schema = Schema::default().with_column("id1", ElementType::Int16);
    let mut table = IndexedTable::new(schema).with_config(config);
    let rows: Vec<Vec<Value>> = ids.iter().map(|v| vec![Value::Int16(*v)]).collect();
    table.append_rows(&rows).unwrap();
    table
}

fn check_every_row_found(table: &IndexedTable, ids: &[i16], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..NELEM {
        let nrow = rng.gen_range(0..ids.len());
        let value = ids[nrow];
        let hits = table
            .where_list(&Condition::equal("id1", value), RowWindow::all())
            .unwrap();
        assert!(hits.contains(&(nrow as u64)), "row {} with {} not found in {:?}", nrow, value, hits);
        for coord in &hits {
            assert_eq!(table.table().value("id1", *coord), Some(Value::Int16(value)));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

/// Bulk build with computed sizes.
#[test]
fn test_last_row_equality_after_build() {
    let ids = random_ids(1);
    let mut table = table_of(&ids, IndexConfig::default());
    table.create_index("id1").unwrap();
    check_every_row_found(&table, &ids, 1);
}

/// Small chunks with a partial last chunk, fully optimized.
#[test]
fn test_last_row_equality_small_chunks() {
    let ids = random_ids(2);
    let mut table = table_of(&ids, IndexConfig::small().with_optlevel(9));
    table.create_index("id1").unwrap();
    check_every_row_found(&table, &ids, 2);
    table.verify_index("id1").unwrap();
}

/// The partial last chunk is reopened and rewritten by each fold.
#[test]
fn test_equality_across_fold_cycles() {
    let ids = random_ids(3);
    let mut table = table_of(&ids[..101], IndexConfig::small());
    table.create_index("id1").unwrap();

    let mut written = 101;
    for batch in [3usize, 1, 7, 13, 50, 200, 846] {
        let rows: Vec<Vec<Value>> = ids[written..written + batch]
            .iter()
            .map(|v| vec![Value::Int16(*v)])
            .collect();
        table.append_rows(&rows).unwrap();
        written += batch;
        table.flush_indexes().unwrap();
        table.verify_index("id1").unwrap();
    }
    assert_eq!(written, NELEM);
    check_every_row_found(&table, &ids, 3);
}

/// Same cycles through a file store, where rewritten slots keep their bytes
/// on disk past the new length.
#[test]
fn test_file_store_shortened_rewrites() {
    let tmp = TempDir::new().unwrap();
    let ids = random_ids(4);
    let location = IndexLocation::Dir(tmp.path().join("id1"));
    let config = IndexConfig::small().with_optlevel(3);
    let mut index = ColumnIndex::build("id1", ElementType::Int16, ids[..6].to_vec(), &config, &location).unwrap();
    for chunk in ids[6..].chunks(5) {
        index.append(chunk.to_vec()).unwrap();
        index.fold().unwrap();
    }
    index.verify().unwrap();

    for (nrow, value) in ids.iter().enumerate().step_by(7) {
        let hits = index.search(&RangeSpec::equal(*value)).unwrap();
        assert!(hits.contains(&(nrow as u64)));
        assert!(hits.iter().all(|c| ids[*c as usize] == *value));
    }
}

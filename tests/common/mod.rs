//! Shared fixtures for the integration tests
//!
//! The four-column table mirrors a typical mixed-type record: a short
//! string, a bool, an int and a float, all derived from one integer key.

#![allow(dead_code)]

use coldex::index::IndexConfig;
use coldex::planner::{Condition, RowWindow};
use coldex::table::{IndexedTable, QueryOptions, Schema};
use coldex::types::{ElementType, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const COLUMNS: [&str; 4] = ["var1", "var2", "var3", "var4"];

/// How row keys are generated
#[derive(Debug, Clone)]
pub enum Keys {
    /// Key equals the row group start
    Sequential,
    /// Uniform in `0..nrows` from a seeded generator
    Random(u64),
    /// Cycles through a fixed list
    Fixed(Vec<i64>),
}

/// Keys for `nrows` rows written in groups of `nrep` identical keys.
///
/// The last group is written whole, so up to `nrep - 1` extra rows appear.
pub fn make_keys(nrows: usize, nrep: usize, keys: &Keys) -> Vec<i64> {
    let mut rng = match keys {
        Keys::Random(seed) => Some(StdRng::seed_from_u64(*seed)),
        _ => None,
    };
    let mut out = Vec::new();
    for i in (0..nrows).step_by(nrep.max(1)) {
        for _ in 0..nrep.max(1) {
            let k = match keys {
                Keys::Random(_) => match rng.as_mut() {
                    Some(r) => r.gen_range(0..nrows as i64),
                    None => 0,
                },
                Keys::Fixed(values) => values[i % values.len()],
                Keys::Sequential => i as i64,
            };
            out.push(k);
        }
    }
    out
}

pub fn schema() -> Schema {
    Schema::default()
        .with_column("var1", ElementType::String { itemsize: 4 })
        .with_column("var2", ElementType::Bool)
        .with_column("var3", ElementType::Int32)
        .with_column("var4", ElementType::Float64)
}

pub fn make_rows(keys: &[i64], nrows: usize) -> Vec<Vec<Value>> {
    keys.iter()
        .map(|k| {
            vec![
                Value::str(&k.to_string()),
                Value::Bool(k % 2 == 1),
                Value::Int32(*k as i32),
                Value::Float64((nrows as i64 - k - 1) as f64),
            ]
        })
        .collect()
}

/// A table holding `rows` with every column indexed in memory.
pub fn indexed_table(rows: &[Vec<Value>], config: IndexConfig) -> IndexedTable {
    let mut table = IndexedTable::new(schema()).with_config(config);
    table.append_rows(rows).unwrap();
    for column in COLUMNS {
        assert_eq!(table.create_index(column).unwrap(), rows.len() as u64);
    }
    table
}

/// Coordinates of `rows` satisfying `cond`, computed row by row.
pub fn brute_force(rows: &[Vec<Value>], cond: &Condition) -> Vec<u64> {
    let schema = schema();
    rows.iter()
        .enumerate()
        .filter(|(_, row)| {
            cond.eval(&|column: &str| schema.position(column).map(|i| row[i].clone()))
        })
        .map(|(i, _)| i as u64)
        .collect()
}

/// Runs `cond` through the index and through a scan and checks both
/// against `expected`.
pub fn assert_query(table: &IndexedTable, cond: &Condition, expected: &[u64]) {
    let indexed = table
        .query_with(cond, &QueryOptions::default())
        .unwrap();
    let scanned = table
        .query_with(cond, &QueryOptions::default().without_index())
        .unwrap();
    assert_eq!(indexed.coords, expected, "indexed {} ({:?})", cond, indexed.plan);
    assert_eq!(scanned.coords, expected, "scanned {}", cond);
}

/// The usual selections around a lower and an upper limit.
pub fn range_conditions(column: &str, il: Value, sl: Value) -> Vec<Condition> {
    let lo = operand(&il);
    let hi = operand(&sl);
    vec![
        Condition::ge(column, lo.clone()).and(Condition::le(column, hi.clone())),
        Condition::ge(column, lo.clone()).and(Condition::lt(column, hi.clone())),
        Condition::gt(column, lo.clone()).and(Condition::le(column, hi.clone())),
        Condition::gt(column, lo.clone()).and(Condition::lt(column, hi.clone())),
        Condition::lt(column, hi.clone()),
        Condition::le(column, hi.clone()),
        Condition::gt(column, lo.clone()),
        Condition::ge(column, lo.clone()),
        Condition::equal(column, lo.clone()),
        Condition::equal(column, hi),
        Condition::lt(column, lo),
    ]
}

pub fn operand(value: &Value) -> coldex::types::Operand {
    use coldex::types::Operand;
    match value {
        Value::Str(s) => Operand::Bytes(s.as_bytes().to_vec()),
        Value::Bool(b) => Operand::Bool(*b),
        Value::Int32(i) => Operand::Int(*i as i128),
        Value::Float64(f) => Operand::Float(*f),
        other => panic!("no operand for {:?}", other),
    }
}

pub fn full() -> RowWindow {
    RowWindow::all()
}

//! Windowed Query Tests
//!
//! Tests for start/stop/step restrictions and planning:
//! - Scans over a window equal slicing the rows, then filtering
//! - Indexed queries intersect with the same window
//! - Only single comparisons and same-column ranges use an index

mod common;

use coldex::index::IndexConfig;
use coldex::planner::{Condition, QueryPlan, RowWindow, ScanReason};
use coldex::table::{IndexedTable, QueryOptions};
use coldex::types::Value;
use common::*;

// =============================================================================
// Helper Functions
// =============================================================================

/// Python-style slice of `0..n`.
fn slice(n: i64, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<u64> {
    let norm = |i: i64| if i < 0 { (i + n).max(0) } else { i.min(n) };
    let start = start.map_or(0, norm);
    let stop = stop.map_or(n, norm);
    (start..stop.max(start)).step_by(step as usize).map(|i| i as u64).collect()
}

fn fixture() -> (IndexedTable, Vec<Vec<Value>>) {
    let nrows = 4 * 5 + 1;
    let keys = make_keys(nrows, 1, &Keys::Random(17));
    let rows = make_rows(&keys, nrows);
    (indexed_table(&rows, IndexConfig::small()), rows)
}

fn windows() -> Vec<(Option<i64>, Option<i64>, i64)> {
    vec![
        (Some(2), Some(10), 1),
        (Some(2), Some(30), 2),
        (Some(2), Some(-5), 1),
        (Some(2), Some(-1), 3),
        (Some(5), Some(-1), 10),
        (Some(5), Some(-3), 11),
        (Some(2), Some(-1), 300),
        (Some(0), Some(-1), 3),
        (Some(1), Some(-1), 3),
        (Some(-8), None, 2),
        (None, Some(-30), 1),
        (Some(15), Some(4), 1),
    ]
}

// =============================================================================
// Window Tests
// =============================================================================

/// Non-indexed scans match slicing the full row sequence.
#[test]
fn test_scan_matches_slicing() {
    let (mut table, rows) = fixture();
    table.disable_indexing_in_queries();
    let n = rows.len() as i64;

    let conditions = [
        Condition::le("var1", "15"),
        Condition::gt("var1", "3").and(Condition::lt("var1", "15")),
        Condition::gt("var1", "15").and(Condition::gt("var1", "3")),
        Condition::le("var3", 15),
        Condition::lt("var3", 3).or(Condition::gt("var3", 15)),
        Condition::equal("var2", true).negate(),
        Condition::not_equal("var4", 10.0),
    ];
    for cond in &conditions {
        let matching = brute_force(&rows, cond);
        for (start, stop, step) in windows() {
            let window = RowWindow::new(start, stop, Some(step));
            let expected: Vec<u64> = slice(n, start, stop, step)
                .into_iter()
                .filter(|c| matching.contains(c))
                .collect();
            assert!(!table.will_query_use_indexing(cond).unwrap());
            assert_eq!(table.where_list(cond, window).unwrap(), expected, "{} over {:?}", cond, window);
        }
    }
}

/// Indexed queries honor the window exactly like scans.
#[test]
fn test_indexed_window_matches_scan() {
    let (table, rows) = fixture();
    let n = rows.len() as i64;
    let conditions = [
        Condition::le("var3", 15),
        Condition::ge("var1", "2").and(Condition::le("var1", "9")),
        Condition::gt("var4", 3.0),
        Condition::equal("var2", false),
    ];
    for cond in &conditions {
        let matching = brute_force(&rows, cond);
        for (start, stop, step) in windows() {
            let window = RowWindow::new(start, stop, Some(step));
            let indexed = table.query_with(cond, &QueryOptions::default().with_window(window)).unwrap();
            assert!(indexed.plan.uses_index());
            let expected: Vec<u64> = slice(n, start, stop, step)
                .into_iter()
                .filter(|c| matching.contains(c))
                .collect();
            assert_eq!(indexed.coords, expected, "{} over {:?}", cond, window);
        }
    }
}

// =============================================================================
// Planner Eligibility
// =============================================================================

fn reason(table: &IndexedTable, cond: &Condition) -> ScanReason {
    match table.plan(cond).unwrap() {
        QueryPlan::Scanned { reason } => reason,
        plan => panic!("{} planned as {:?}", cond, plan),
    }
}

/// Which condition shapes use an index.
#[test]
fn test_eligibility() {
    let (mut table, _) = fixture();
    table.drop_index("var4").unwrap();

    for cond in [
        Condition::lt("var3", 4),
        Condition::le("var1", "4"),
        Condition::gt("var2", false),
        Condition::ge("var3", 4),
        Condition::equal("var3", 4),
        Condition::ge("var3", 4).and(Condition::lt("var3", 9)),
        Condition::lt("var3", 9).and(Condition::ge("var3", 4)),
    ] {
        assert!(table.will_query_use_indexing(&cond).unwrap(), "{}", cond);
    }

    assert_eq!(reason(&table, &Condition::lt("var4", 1.0)), ScanReason::NoIndex { column: "var4".into() });
    assert_eq!(
        reason(&table, &Condition::lt("var3", 4).and(Condition::gt("var1", "2"))),
        ScanReason::MultipleColumns
    );
    assert_eq!(
        reason(&table, &Condition::gt("var3", 4).and(Condition::gt("var3", 9))),
        ScanReason::NotARange
    );
    assert_eq!(
        reason(&table, &Condition::equal("var3", 1).or(Condition::equal("var3", 2))),
        ScanReason::Disjunction
    );
    assert_eq!(
        reason(&table, &Condition::not_equal("var3", 1)),
        ScanReason::UnsupportedOperator { op: "!=".into() }
    );
    assert!(table
        .query_with(&Condition::equal("var3", 4), &QueryOptions::default().without_index())
        .map(|out| !out.plan.uses_index())
        .unwrap());
}

/// Unknown columns and mistyped operands fail on both paths.
#[test]
fn test_invalid_conditions() {
    let (table, _) = fixture();
    for opts in [QueryOptions::default(), QueryOptions::default().without_index()] {
        let err = table.query_with(&Condition::equal("nope", 1), &opts).unwrap_err();
        assert_eq!(err.code(), "COLDEX_QUERY_UNKNOWN_COLUMN");
        let err = table.query_with(&Condition::equal("var1", 1), &opts).unwrap_err();
        assert_eq!(err.code(), "COLDEX_QUERY_TYPE_MISMATCH");
        let err = table.query_with(&Condition::lt("var3", "x"), &opts).unwrap_err();
        assert_eq!(err.code(), "COLDEX_QUERY_TYPE_MISMATCH");
    }
    let err = table.where_list(&Condition::equal("var3", 1), RowWindow::range(5, 1, -1)).unwrap_err();
    assert_eq!(err.code(), "COLDEX_QUERY_INVALID_WINDOW");
}

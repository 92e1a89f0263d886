//! CLI command implementations
//!
//! `inspect`, `verify` and `optimize` work on one persisted index directory.
//! `demo` builds a random table in process and checks that every query
//! returns the same rows with and without its index.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value as Json};

use crate::index::{AnyIndex, IndexConfig};
use crate::planner::{Condition, RowWindow};
use crate::table::{IndexedTable, QueryOptions, Schema};
use crate::types::{ElementType, Value};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_response;

const DEMO_COLUMN: &str = "value";
const DEMO_OPERANDS: usize = 32;

pub fn run_command(command: Command) -> CliResult<()> {
    let data = match command {
        Command::Inspect { dir } => inspect(&dir)?,
        Command::Verify { dir } => verify(&dir)?,
        Command::Optimize { dir, level } => optimize(&dir, level)?,
        Command::Demo {
            rows,
            seed,
            optlevel,
            dir,
            config,
        } => demo(rows, seed, optlevel, dir, config)?,
    };
    write_response(data)
}

pub fn inspect(dir: &Path) -> CliResult<Json> {
    let index = AnyIndex::open(dir)?;
    Ok(serde_json::to_value(index.stats())?)
}

pub fn verify(dir: &Path) -> CliResult<Json> {
    let index = AnyIndex::open(dir)?;
    index.verify()?;
    Ok(json!({
        "column": index.column(),
        "rows": index.nrows(),
        "valid": true,
    }))
}

pub fn optimize(dir: &Path, level: u8) -> CliResult<Json> {
    let mut index = AnyIndex::open(dir)?;
    let summary = index.optimize(level)?;
    index.persist()?;
    Ok(serde_json::to_value(summary)?)
}

pub fn demo(
    rows: usize,
    seed: u64,
    optlevel: Option<u8>,
    dir: Option<PathBuf>,
    config: Option<PathBuf>,
) -> CliResult<Json> {
    let mut config = match config {
        Some(path) => IndexConfig::load(&path)?,
        None => IndexConfig::default(),
    };
    if let Some(level) = optlevel {
        config = config.with_optlevel(level);
    }
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let values: Vec<i16> = (0..rows).map(|_| rng.gen()).collect();
    let batch: Vec<Vec<Value>> = values.iter().map(|v| vec![Value::Int16(*v)]).collect();

    let schema = Schema::default().with_column(DEMO_COLUMN, ElementType::Int16);
    let mut table = IndexedTable::new(schema).with_config(config);
    table.append_rows(&batch)?;
    match &dir {
        Some(path) => table.create_index_persistent(DEMO_COLUMN, path)?,
        None => table.create_index(DEMO_COLUMN)?,
    };

    let mut operands: Vec<i16> = (0..DEMO_OPERANDS.min(values.len()))
        .map(|_| values[rng.gen_range(0..values.len())])
        .collect();
    operands.push(i16::MIN);
    operands.push(i16::MAX);

    let mut queries = 0usize;
    let mut matches = 0usize;
    for operand in &operands {
        let p = i64::from(*operand);
        let conditions = [
            Condition::equal(DEMO_COLUMN, p),
            Condition::lt(DEMO_COLUMN, p),
            Condition::le(DEMO_COLUMN, p),
            Condition::gt(DEMO_COLUMN, p),
            Condition::ge(DEMO_COLUMN, p),
            Condition::gt(DEMO_COLUMN, p - 100).and(Condition::le(DEMO_COLUMN, p + 100)),
        ];
        for cond in &conditions {
            let indexed = table.where_list(cond, RowWindow::all())?;
            let scanned = table
                .query_with(cond, &QueryOptions::default().without_index())?
                .coords;
            if indexed != scanned {
                return Err(CliError::mismatch(format!(
                    "{}: index returned {} rows, scan returned {}",
                    cond,
                    indexed.len(),
                    scanned.len()
                )));
            }
            queries += 1;
            matches += indexed.len();
        }
    }

    tracing::info!(rows, seed, queries, "demo cross-check passed");

    Ok(json!({
        "rows": rows,
        "seed": seed,
        "queries": queries,
        "matches": matches,
        "index": table.index_stats(DEMO_COLUMN)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_demo_then_inspect_persisted_index() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("demo");
        let out = demo(500, 3, Some(4), Some(dir.clone()), None).unwrap();
        assert_eq!(out["rows"], 500);
        assert_eq!(out["index"]["indexed_rows"], 500);

        let stats = inspect(&dir).unwrap();
        assert_eq!(stats["column"], DEMO_COLUMN);
        assert_eq!(verify(&dir).unwrap()["valid"], true);

        let summary = optimize(&dir, 9).unwrap();
        assert_eq!(summary["level"], 9);
        assert_eq!(verify(&dir).unwrap()["rows"], 500);
    }

    #[test]
    fn test_demo_reads_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, r#"{"optlevel": 2, "block_sizes": {"superblock_size": 64, "block_size": 16, "chunk_size": 8}}"#)
            .unwrap();
        let out = demo(200, 9, None, None, Some(path)).unwrap();
        assert_eq!(out["index"]["optlevel"], 2);
        assert_eq!(out["index"]["block_sizes"]["chunk_size"], 8);
    }

    #[test]
    fn test_missing_index_dir() {
        let tmp = TempDir::new().unwrap();
        let err = inspect(&tmp.path().join("nothing")).unwrap_err();
        assert_eq!(err.code_str(), "COLDEX_INDEX_MANIFEST");
    }
}

//! Tables with column indexes
//!
//! `IndexedTable` keeps a `MemoryTable` and one lock-guarded index per
//! indexed column. Queries are planned per condition and run either as an
//! index search intersected with the row window, or as a sequential scan of
//! the window. Both paths return coordinates in ascending order.
//!
//! Lifecycle operations on an index take its write lock, searches take its
//! read lock. Indexes of different columns never share a lock.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::Serialize;

use super::column::Schema;
use super::memory::{MemoryTable, RowSource};
use crate::index::{AnyIndex, FoldReport, IndexConfig, IndexLocation, IndexStats};
use crate::optimizer::OptimizeSummary;
use crate::planner::{
    Condition, IndexMetadata, QueryError, QueryPlan, QueryPlanner, QueryResult, ResolvedWindow,
    RowWindow, ScanReason,
};
use crate::search::RangeSpec;
use crate::types::Value;

/// Per-query execution options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Allow the planner to pick an index
    pub use_index: bool,
    pub window: RowWindow,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            use_index: true,
            window: RowWindow::all(),
        }
    }
}

impl QueryOptions {
    pub fn without_index(mut self) -> Self {
        self.use_index = false;
        self
    }

    pub fn with_window(mut self, window: RowWindow) -> Self {
        self.window = window;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutput {
    pub plan: QueryPlan,
    /// Matching coordinates, ascending
    pub coords: Vec<u64>,
}

struct IndexEntry {
    index: RwLock<AnyIndex>,
    persistent: bool,
}

pub struct IndexedTable {
    table: MemoryTable,
    indexes: HashMap<String, IndexEntry>,
    indexing_enabled: bool,
    config: IndexConfig,
}

impl IndexedTable {
    pub fn new(schema: Schema) -> Self {
        Self::from_table(MemoryTable::new(schema))
    }

    pub fn from_table(table: MemoryTable) -> Self {
        Self {
            table,
            indexes: HashMap::new(),
            indexing_enabled: true,
            config: IndexConfig::default(),
        }
    }

    /// Configuration used by indexes created without an explicit one
    pub fn with_config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    pub fn table(&self) -> &MemoryTable {
        &self.table
    }

    pub fn schema(&self) -> &Schema {
        self.table.schema()
    }

    pub fn nrows(&self) -> u64 {
        self.table.nrows()
    }

    // =========================================================================
    // Index lifecycle
    // =========================================================================

    /// Builds an in-memory index over `column`, returning the rows indexed.
    pub fn create_index(&mut self, column: &str) -> QueryResult<u64> {
        let config = self.config.clone();
        self.create_index_with(column, &config, &IndexLocation::Memory)
    }

    /// Builds an index stored under `dir` and persists it.
    pub fn create_index_persistent(&mut self, column: &str, dir: &Path) -> QueryResult<u64> {
        let config = self.config.clone();
        self.create_index_with(column, &config, &IndexLocation::Dir(dir.to_path_buf()))
    }

    pub fn create_index_with(
        &mut self,
        column: &str,
        config: &IndexConfig,
        location: &IndexLocation,
    ) -> QueryResult<u64> {
        if self.indexes.contains_key(column) {
            return Err(QueryError::IndexExists(column.to_string()));
        }
        let data = self
            .table
            .column_data(column)
            .ok_or_else(|| QueryError::UnknownColumn(column.to_string()))?;
        let mut index = AnyIndex::build(column, data, config, location)?;
        let persistent = matches!(location, IndexLocation::Dir(_));
        if persistent {
            index.persist()?;
        }
        let rows = index.nrows();
        self.insert(column, index, persistent);
        Ok(rows)
    }

    /// Attaches an index persisted under `dir` to its column.
    ///
    /// An index that lags behind the table is caught up from the column. An
    /// index covering more rows than the table describes data this table
    /// does not hold; it is discarded and rebuilt with its own settings.
    pub fn attach_index(&mut self, dir: &Path) -> QueryResult<u64> {
        let mut index = AnyIndex::open(dir)?;
        let column = index.column().to_string();
        if self.indexes.contains_key(&column) {
            return Err(QueryError::IndexExists(column));
        }
        let desc = self
            .table
            .schema()
            .column(&column)
            .ok_or_else(|| QueryError::UnknownColumn(column.clone()))?;
        if desc.ty != index.element_type() {
            return Err(QueryError::TypeMismatch {
                column: column.clone(),
                ty: desc.ty,
                operand: format!("index of {}", index.element_type()),
            });
        }
        let data = self
            .table
            .column_data(&column)
            .ok_or_else(|| QueryError::UnknownColumn(column.clone()))?;

        let table_rows = self.table.nrows();
        if index.nrows() > table_rows {
            tracing::warn!(
                column = %column,
                index_rows = index.nrows(),
                table_rows,
                "persisted index is ahead of the table, rebuilding"
            );
            let meta = index.meta();
            let config = IndexConfig {
                optlevel: meta.optlevel,
                block_sizes: Some(meta.block_sizes),
                auto_fold: meta.auto_fold,
                ..self.config.clone()
            };
            index.destroy()?;
            index = AnyIndex::build(&column, data, &config, &IndexLocation::Dir(dir.to_path_buf()))?;
        } else if index.nrows() < table_rows {
            let start = index.nrows() as usize;
            index.append_from(data, start)?;
        }
        index.persist()?;

        let rows = index.nrows();
        self.insert(&column, index, true);
        Ok(rows)
    }

    /// Removes the index of `column` together with its stored chunks.
    pub fn drop_index(&mut self, column: &str) -> QueryResult<()> {
        let entry = self
            .indexes
            .remove(column)
            .ok_or_else(|| QueryError::NoIndex(column.to_string()))?;
        let index = entry
            .index
            .into_inner()
            .map_err(|_| QueryError::lock_poisoned(column))?;
        index.destroy()?;
        Ok(())
    }

    fn insert(&mut self, column: &str, index: AnyIndex, persistent: bool) {
        self.indexes.insert(
            column.to_string(),
            IndexEntry {
                index: RwLock::new(index),
                persistent,
            },
        );
    }

    /// Indexed column names, sorted
    pub fn indexed_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexes.contains_key(column)
    }

    /// Appends rows to the table and feeds them to every index.
    ///
    /// Every index is attempted even when one fails; the first error is
    /// returned. An index left short of the table is scanned around by
    /// queries until it is rebuilt. Disk-backed indexes that auto-folded are
    /// persisted, since the fold rewrote their chunk slots.
    pub fn append_rows(&mut self, rows: &[Vec<Value>]) -> QueryResult<usize> {
        let appended = self.table.append_rows(rows)?;
        let mut first_error = None;
        for name in self.indexed_columns() {
            if let Err(e) = self.feed_index(&name) {
                tracing::warn!(column = %name, error = %e, "index could not take appended rows");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(appended),
        }
    }

    fn feed_index(&self, name: &str) -> QueryResult<()> {
        let data = self
            .table
            .column_data(name)
            .ok_or_else(|| QueryError::UnknownColumn(name.to_string()))?;
        let persistent = self.entry(name)?.persistent;
        let mut index = self.write(name)?;
        let start = index.nrows() as usize;
        if let Some(report) = index.append_from(data, start)? {
            tracing::debug!(column = %name, rows_folded = report.rows_folded, "auto-folded tail");
            if persistent {
                index.persist()?;
            }
        }
        Ok(())
    }

    /// Folds the tail of every dirty index and persists disk-backed ones.
    pub fn flush_indexes(&self) -> QueryResult<Vec<(String, FoldReport)>> {
        let mut reports = Vec::new();
        for name in self.indexed_columns() {
            let persistent = self.entry(&name)?.persistent;
            let mut index = self.write(&name)?;
            if index.is_dirty() {
                reports.push((name.clone(), index.fold()?));
            }
            if persistent {
                index.persist()?;
            }
        }
        Ok(reports)
    }

    pub fn optimize_index(&self, column: &str, level: u8) -> QueryResult<OptimizeSummary> {
        let persistent = self.entry(column)?.persistent;
        let mut index = self.write(column)?;
        let summary = index.optimize(level)?;
        if persistent {
            index.persist()?;
        }
        Ok(summary)
    }

    pub fn index_stats(&self, column: &str) -> QueryResult<IndexStats> {
        Ok(self.read(column)?.stats())
    }

    pub fn verify_index(&self, column: &str) -> QueryResult<()> {
        self.read(column)?.verify()?;
        Ok(())
    }

    fn entry(&self, column: &str) -> QueryResult<&IndexEntry> {
        self.indexes
            .get(column)
            .ok_or_else(|| QueryError::NoIndex(column.to_string()))
    }

    fn read(&self, column: &str) -> QueryResult<std::sync::RwLockReadGuard<'_, AnyIndex>> {
        self.entry(column)?
            .index
            .read()
            .map_err(|_| QueryError::lock_poisoned(column))
    }

    fn write(&self, column: &str) -> QueryResult<std::sync::RwLockWriteGuard<'_, AnyIndex>> {
        self.entry(column)?
            .index
            .write()
            .map_err(|_| QueryError::lock_poisoned(column))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn disable_indexing_in_queries(&mut self) {
        self.indexing_enabled = false;
    }

    pub fn enable_indexing_in_queries(&mut self) {
        self.indexing_enabled = true;
    }

    pub fn metadata(&self) -> IndexMetadata {
        IndexMetadata::with_indexes(self.indexes.keys().cloned())
    }

    /// Plans `condition` under the table's current indexing setting.
    pub fn plan(&self, condition: &Condition) -> QueryResult<QueryPlan> {
        self.plan_with(condition, true)
    }

    pub fn will_query_use_indexing(&self, condition: &Condition) -> QueryResult<bool> {
        Ok(self.plan(condition)?.uses_index())
    }

    fn plan_with(&self, condition: &Condition, use_index: bool) -> QueryResult<QueryPlan> {
        condition.validate(self.table.schema())?;
        let metadata = self.metadata();
        let plan = QueryPlanner::new(&metadata)
            .with_indexing(self.indexing_enabled && use_index)
            .plan(condition);
        if let QueryPlan::Indexed { column, .. } = &plan {
            let index_rows = self.read(column)?.nrows();
            let table_rows = self.table.nrows();
            if index_rows != table_rows {
                tracing::warn!(column = %column, index_rows, table_rows, "index out of step with table, scanning");
                return Ok(QueryPlan::Scanned {
                    reason: ScanReason::StaleIndex { column: column.clone() },
                });
            }
        }
        Ok(plan)
    }

    /// Coordinates of rows in `window` satisfying `condition`, ascending.
    pub fn where_list(&self, condition: &Condition, window: RowWindow) -> QueryResult<Vec<u64>> {
        Ok(self
            .query_with(condition, &QueryOptions::default().with_window(window))?
            .coords)
    }

    /// Matching rows in original row order
    pub fn where_rows(&self, condition: &Condition, window: RowWindow) -> QueryResult<Vec<Vec<Value>>> {
        let coords = self.where_list(condition, window)?;
        self.read_coordinates(&coords)
    }

    pub fn read_coordinates(&self, coords: &[u64]) -> QueryResult<Vec<Vec<Value>>> {
        self.table.read_coordinates(coords)
    }

    pub fn query_with(&self, condition: &Condition, options: &QueryOptions) -> QueryResult<QueryOutput> {
        let plan = self.plan_with(condition, options.use_index)?;
        let window = options.window.resolve(self.table.nrows())?;
        let coords = match &plan {
            QueryPlan::Indexed { column, range } => self.indexed_coords(column, range, &window)?,
            QueryPlan::Scanned { .. } => self.scan_coords(condition, &window),
        };
        tracing::debug!(
            condition = %condition,
            indexed = plan.uses_index(),
            matches = coords.len(),
            "query executed"
        );
        Ok(QueryOutput { plan, coords })
    }

    fn indexed_coords(&self, column: &str, range: &RangeSpec, window: &ResolvedWindow) -> QueryResult<Vec<u64>> {
        let mut coords = self.read(column)?.search(range)?;
        coords.retain(|c| window.contains(*c));
        coords.sort_unstable();
        Ok(coords)
    }

    fn scan_coords(&self, condition: &Condition, window: &ResolvedWindow) -> Vec<u64> {
        window
            .iter()
            .filter(|coord| condition.eval(&|column: &str| self.table.value(column, *coord)))
            .collect()
    }
}

//! In-memory row storage

use super::column::{ColumnData, Schema};
use crate::planner::{QueryError, QueryResult};
use crate::types::Value;

/// Row storage as seen by indexes and scans.
pub trait RowSource {
    fn schema(&self) -> &Schema;

    fn nrows(&self) -> u64;

    /// All values of a column in row order
    fn column_data(&self, name: &str) -> Option<&ColumnData>;

    /// One cell, `None` when the column or row does not exist
    fn value(&self, column: &str, coord: u64) -> Option<Value>;

    fn read_row(&self, coord: u64) -> QueryResult<Vec<Value>>;
}

#[derive(Debug, Clone)]
pub struct MemoryTable {
    schema: Schema,
    columns: Vec<ColumnData>,
    nrows: u64,
}

impl MemoryTable {
    pub fn new(schema: Schema) -> Self {
        let columns = schema.columns.iter().map(|c| ColumnData::empty(c.ty)).collect();
        Self {
            schema,
            columns,
            nrows: 0,
        }
    }

    /// Appends rows, converting each value to its column's type.
    ///
    /// All rows are checked before any is stored.
    pub fn append_rows(&mut self, rows: &[Vec<Value>]) -> QueryResult<usize> {
        let mut converted = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != self.schema.len() {
                return Err(QueryError::InvalidRow(format!(
                    "row {} has {} values, table has {} columns",
                    i,
                    row.len(),
                    self.schema.len()
                )));
            }
            let mut out = Vec::with_capacity(row.len());
            for (value, desc) in row.iter().zip(&self.schema.columns) {
                let v = value.coerce(&desc.ty).ok_or_else(|| {
                    QueryError::InvalidRow(format!(
                        "value {} does not fit column '{}' of type {}",
                        value, desc.name, desc.ty
                    ))
                })?;
                out.push(v);
            }
            converted.push(out);
        }

        let before = self.nrows as usize;
        let stored = converted
            .into_iter()
            .all(|row| self.columns.iter_mut().zip(row).all(|(col, v)| col.push(v)));
        if !stored {
            for col in &mut self.columns {
                col.truncate(before);
            }
            return Err(QueryError::InvalidRow("coerced value has the wrong type".into()));
        }
        self.nrows += rows.len() as u64;
        Ok(rows.len())
    }

    pub fn read_coordinates(&self, coords: &[u64]) -> QueryResult<Vec<Vec<Value>>> {
        coords.iter().map(|c| self.read_row(*c)).collect()
    }

    pub fn columns(&self) -> &[ColumnData] {
        &self.columns
    }
}

impl RowSource for MemoryTable {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn nrows(&self) -> u64 {
        self.nrows
    }

    fn column_data(&self, name: &str) -> Option<&ColumnData> {
        self.schema.position(name).map(|i| &self.columns[i])
    }

    fn value(&self, column: &str, coord: u64) -> Option<Value> {
        self.column_data(column)?.get(usize::try_from(coord).ok()?)
    }

    fn read_row(&self, coord: u64) -> QueryResult<Vec<Value>> {
        if coord >= self.nrows {
            return Err(QueryError::CoordinateOutOfRange {
                coord,
                nrows: self.nrows,
            });
        }
        self.columns
            .iter()
            .map(|c| {
                c.get(coord as usize).ok_or(QueryError::CoordinateOutOfRange {
                    coord,
                    nrows: self.nrows,
                })
            })
            .collect()
    }
}

//! Type-erased column index
//!
//! The element type is matched once, when an index is built or opened.
//! Every later call dispatches to the monomorphized `ColumnIndex<T>`.

use std::path::Path;

use super::column_index::{ColumnIndex, FoldReport, IndexLocation, IndexStats, SearchOutcome};
use super::config::IndexConfig;
use super::errors::{IndexError, IndexResult};
use super::manifest::{read_meta, IndexMeta};
use crate::chunk::FileChunkStore;
use crate::optimizer::OptimizeSummary;
use crate::search::RangeSpec;
use crate::table::ColumnData;
use crate::types::{ElementType, FixedString};

pub enum AnyIndex {
    Bool(ColumnIndex<bool>),
    Int8(ColumnIndex<i8>),
    Int16(ColumnIndex<i16>),
    Int32(ColumnIndex<i32>),
    Int64(ColumnIndex<i64>),
    UInt8(ColumnIndex<u8>),
    UInt16(ColumnIndex<u16>),
    UInt32(ColumnIndex<u32>),
    UInt64(ColumnIndex<u64>),
    Float32(ColumnIndex<f32>),
    Float64(ColumnIndex<f64>),
    Str(ColumnIndex<FixedString>),
}

macro_rules! dispatch {
    ($index:expr, $ix:ident => $body:expr) => {
        match $index {
            AnyIndex::Bool($ix) => $body,
            AnyIndex::Int8($ix) => $body,
            AnyIndex::Int16($ix) => $body,
            AnyIndex::Int32($ix) => $body,
            AnyIndex::Int64($ix) => $body,
            AnyIndex::UInt8($ix) => $body,
            AnyIndex::UInt16($ix) => $body,
            AnyIndex::UInt32($ix) => $body,
            AnyIndex::UInt64($ix) => $body,
            AnyIndex::Float32($ix) => $body,
            AnyIndex::Float64($ix) => $body,
            AnyIndex::Str($ix) => $body,
        }
    };
}

/// Pairs an index with column data of the same element type.
macro_rules! with_values {
    ($index:expr, $data:expr, $ix:ident, $vals:ident => $body:expr, $otherwise:expr) => {
        match ($index, $data) {
            (AnyIndex::Bool($ix), ColumnData::Bool($vals)) => $body,
            (AnyIndex::Int8($ix), ColumnData::Int8($vals)) => $body,
            (AnyIndex::Int16($ix), ColumnData::Int16($vals)) => $body,
            (AnyIndex::Int32($ix), ColumnData::Int32($vals)) => $body,
            (AnyIndex::Int64($ix), ColumnData::Int64($vals)) => $body,
            (AnyIndex::UInt8($ix), ColumnData::UInt8($vals)) => $body,
            (AnyIndex::UInt16($ix), ColumnData::UInt16($vals)) => $body,
            (AnyIndex::UInt32($ix), ColumnData::UInt32($vals)) => $body,
            (AnyIndex::UInt64($ix), ColumnData::UInt64($vals)) => $body,
            (AnyIndex::Float32($ix), ColumnData::Float32($vals)) => $body,
            (AnyIndex::Float64($ix), ColumnData::Float64($vals)) => $body,
            (AnyIndex::Str($ix), ColumnData::Str { values: $vals, .. }) => $body,
            _ => $otherwise,
        }
    };
}

macro_rules! open_as {
    ($variant:ident, $t:ty, $dir:expr) => {
        AnyIndex::$variant(ColumnIndex::<$t>::open(Box::new(FileChunkStore::<$t>::open($dir)?))?)
    };
}

impl AnyIndex {
    /// Builds an index over all of `data`. Complex columns fail with
    /// `UnsupportedType` before anything is created.
    pub fn build(
        column: &str,
        data: &ColumnData,
        config: &IndexConfig,
        location: &IndexLocation,
    ) -> IndexResult<Self> {
        let ty = data.element_type();
        Ok(match data {
            ColumnData::Bool(v) => AnyIndex::Bool(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::Int8(v) => AnyIndex::Int8(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::Int16(v) => AnyIndex::Int16(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::Int32(v) => AnyIndex::Int32(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::Int64(v) => AnyIndex::Int64(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::UInt8(v) => AnyIndex::UInt8(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::UInt16(v) => AnyIndex::UInt16(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::UInt32(v) => AnyIndex::UInt32(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::UInt64(v) => AnyIndex::UInt64(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::Float32(v) => AnyIndex::Float32(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::Float64(v) => AnyIndex::Float64(ColumnIndex::build(column, ty, v.clone(), config, location)?),
            ColumnData::Str { values, .. } => {
                AnyIndex::Str(ColumnIndex::build(column, ty, values.clone(), config, location)?)
            }
            ColumnData::Complex64(_) | ColumnData::Complex128(_) => {
                return Err(IndexError::UnsupportedType {
                    column: column.to_string(),
                    ty,
                })
            }
        })
    }

    /// Opens a persisted index directory.
    pub fn open(dir: &Path) -> IndexResult<Self> {
        let meta = read_meta(dir)?;
        Ok(match meta.element_type {
            ElementType::Bool => open_as!(Bool, bool, dir),
            ElementType::Int8 => open_as!(Int8, i8, dir),
            ElementType::Int16 => open_as!(Int16, i16, dir),
            ElementType::Int32 => open_as!(Int32, i32, dir),
            ElementType::Int64 => open_as!(Int64, i64, dir),
            ElementType::UInt8 => open_as!(UInt8, u8, dir),
            ElementType::UInt16 => open_as!(UInt16, u16, dir),
            ElementType::UInt32 => open_as!(UInt32, u32, dir),
            ElementType::UInt64 => open_as!(UInt64, u64, dir),
            ElementType::Float32 => open_as!(Float32, f32, dir),
            ElementType::Float64 => open_as!(Float64, f64, dir),
            ElementType::String { .. } => open_as!(Str, FixedString, dir),
            ty @ (ElementType::Complex64 | ElementType::Complex128) => {
                return Err(IndexError::UnsupportedType {
                    column: meta.column,
                    ty,
                })
            }
        })
    }

    /// Appends `data[start..]` to the tail.
    pub fn append_from(&mut self, data: &ColumnData, start: usize) -> IndexResult<Option<FoldReport>> {
        let ty = self.element_type();
        with_values!(self, data, ix, vals => {
            let new = vals.get(start..).unwrap_or(&[]).to_vec();
            ix.append(new)
        }, Err(IndexError::Invariant(format!(
            "column data of type {} cannot feed an index of type {}",
            data.element_type(),
            ty
        ))))
    }

    pub fn fold(&mut self) -> IndexResult<FoldReport> {
        dispatch!(self, ix => ix.fold())
    }

    pub fn optimize(&mut self, level: u8) -> IndexResult<OptimizeSummary> {
        dispatch!(self, ix => ix.optimize(level))
    }

    pub fn search(&self, range: &RangeSpec) -> IndexResult<Vec<u64>> {
        dispatch!(self, ix => ix.search(range))
    }

    pub fn search_with_stats(&self, range: &RangeSpec) -> IndexResult<SearchOutcome> {
        dispatch!(self, ix => ix.search_with_stats(range))
    }

    pub fn verify(&self) -> IndexResult<()> {
        dispatch!(self, ix => ix.verify())
    }

    pub fn stats(&self) -> IndexStats {
        dispatch!(self, ix => ix.stats())
    }

    pub fn meta(&self) -> IndexMeta {
        dispatch!(self, ix => ix.meta())
    }

    pub fn persist(&mut self) -> IndexResult<()> {
        dispatch!(self, ix => ix.persist())
    }

    pub fn destroy(self) -> IndexResult<()> {
        dispatch!(self, ix => ix.destroy())
    }

    pub fn column(&self) -> &str {
        dispatch!(self, ix => ix.column())
    }

    pub fn element_type(&self) -> ElementType {
        dispatch!(self, ix => ix.element_type())
    }

    pub fn nrows(&self) -> u64 {
        dispatch!(self, ix => ix.nrows())
    }

    pub fn is_dirty(&self) -> bool {
        dispatch!(self, ix => ix.is_dirty())
    }

    pub fn optlevel(&self) -> u8 {
        dispatch!(self, ix => ix.optlevel())
    }
}

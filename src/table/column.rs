//! Typed column storage

use serde::{Deserialize, Serialize};

use crate::types::{ElementType, FixedString, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDesc {
    pub name: String,
    pub ty: ElementType,
}

impl ColumnDesc {
    pub fn new(name: impl Into<String>, ty: ElementType) -> Self {
        Self { name: name.into(), ty }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnDesc>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDesc>) -> Self {
        Self { columns }
    }

    pub fn with_column(mut self, name: impl Into<String>, ty: ElementType) -> Self {
        self.columns.push(ColumnDesc::new(name, ty));
        self
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDesc> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Values of one column in row order.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Str { itemsize: usize, values: Vec<FixedString> },
    Complex64(Vec<(f32, f32)>),
    Complex128(Vec<(f64, f64)>),
}

impl ColumnData {
    pub fn empty(ty: ElementType) -> Self {
        match ty {
            ElementType::Bool => ColumnData::Bool(Vec::new()),
            ElementType::Int8 => ColumnData::Int8(Vec::new()),
            ElementType::Int16 => ColumnData::Int16(Vec::new()),
            ElementType::Int32 => ColumnData::Int32(Vec::new()),
            ElementType::Int64 => ColumnData::Int64(Vec::new()),
            ElementType::UInt8 => ColumnData::UInt8(Vec::new()),
            ElementType::UInt16 => ColumnData::UInt16(Vec::new()),
            ElementType::UInt32 => ColumnData::UInt32(Vec::new()),
            ElementType::UInt64 => ColumnData::UInt64(Vec::new()),
            ElementType::Float32 => ColumnData::Float32(Vec::new()),
            ElementType::Float64 => ColumnData::Float64(Vec::new()),
            ElementType::String { itemsize } => ColumnData::Str {
                itemsize,
                values: Vec::new(),
            },
            ElementType::Complex64 => ColumnData::Complex64(Vec::new()),
            ElementType::Complex128 => ColumnData::Complex128(Vec::new()),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ColumnData::Bool(_) => ElementType::Bool,
            ColumnData::Int8(_) => ElementType::Int8,
            ColumnData::Int16(_) => ElementType::Int16,
            ColumnData::Int32(_) => ElementType::Int32,
            ColumnData::Int64(_) => ElementType::Int64,
            ColumnData::UInt8(_) => ElementType::UInt8,
            ColumnData::UInt16(_) => ElementType::UInt16,
            ColumnData::UInt32(_) => ElementType::UInt32,
            ColumnData::UInt64(_) => ElementType::UInt64,
            ColumnData::Float32(_) => ElementType::Float32,
            ColumnData::Float64(_) => ElementType::Float64,
            ColumnData::Str { itemsize, .. } => ElementType::String { itemsize: *itemsize },
            ColumnData::Complex64(_) => ElementType::Complex64,
            ColumnData::Complex128(_) => ElementType::Complex128,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::UInt8(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Str { values, .. } => values.len(),
            ColumnData::Complex64(v) => v.len(),
            ColumnData::Complex128(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize) -> Option<Value> {
        Some(match self {
            ColumnData::Bool(v) => Value::Bool(*v.get(row)?),
            ColumnData::Int8(v) => Value::Int8(*v.get(row)?),
            ColumnData::Int16(v) => Value::Int16(*v.get(row)?),
            ColumnData::Int32(v) => Value::Int32(*v.get(row)?),
            ColumnData::Int64(v) => Value::Int64(*v.get(row)?),
            ColumnData::UInt8(v) => Value::UInt8(*v.get(row)?),
            ColumnData::UInt16(v) => Value::UInt16(*v.get(row)?),
            ColumnData::UInt32(v) => Value::UInt32(*v.get(row)?),
            ColumnData::UInt64(v) => Value::UInt64(*v.get(row)?),
            ColumnData::Float32(v) => Value::Float32(*v.get(row)?),
            ColumnData::Float64(v) => Value::Float64(*v.get(row)?),
            ColumnData::Str { values, .. } => Value::Str(values.get(row)?.clone()),
            ColumnData::Complex64(v) => {
                let (re, im) = *v.get(row)?;
                Value::Complex64(re, im)
            }
            ColumnData::Complex128(v) => {
                let (re, im) = *v.get(row)?;
                Value::Complex128(re, im)
            }
        })
    }

    /// Appends a value that already has this column's exact type.
    /// Returns false and leaves the column unchanged otherwise.
    pub(crate) fn push(&mut self, value: Value) -> bool {
        match (self, value) {
            (ColumnData::Bool(v), Value::Bool(x)) => v.push(x),
            (ColumnData::Int8(v), Value::Int8(x)) => v.push(x),
            (ColumnData::Int16(v), Value::Int16(x)) => v.push(x),
            (ColumnData::Int32(v), Value::Int32(x)) => v.push(x),
            (ColumnData::Int64(v), Value::Int64(x)) => v.push(x),
            (ColumnData::UInt8(v), Value::UInt8(x)) => v.push(x),
            (ColumnData::UInt16(v), Value::UInt16(x)) => v.push(x),
            (ColumnData::UInt32(v), Value::UInt32(x)) => v.push(x),
            (ColumnData::UInt64(v), Value::UInt64(x)) => v.push(x),
            (ColumnData::Float32(v), Value::Float32(x)) => v.push(x),
            (ColumnData::Float64(v), Value::Float64(x)) => v.push(x),
            (ColumnData::Str { values, .. }, Value::Str(x)) => values.push(x),
            (ColumnData::Complex64(v), Value::Complex64(re, im)) => v.push((re, im)),
            (ColumnData::Complex128(v), Value::Complex128(re, im)) => v.push((re, im)),
            _ => return false,
        }
        true
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        match self {
            ColumnData::Bool(v) => v.truncate(len),
            ColumnData::Int8(v) => v.truncate(len),
            ColumnData::Int16(v) => v.truncate(len),
            ColumnData::Int32(v) => v.truncate(len),
            ColumnData::Int64(v) => v.truncate(len),
            ColumnData::UInt8(v) => v.truncate(len),
            ColumnData::UInt16(v) => v.truncate(len),
            ColumnData::UInt32(v) => v.truncate(len),
            ColumnData::UInt64(v) => v.truncate(len),
            ColumnData::Float32(v) => v.truncate(len),
            ColumnData::Float64(v) => v.truncate(len),
            ColumnData::Str { values, .. } => values.truncate(len),
            ColumnData::Complex64(v) => v.truncate(len),
            ColumnData::Complex128(v) => v.truncate(len),
        }
    }
}

//! Column element types
//!
//! The closed set of element types a table column may hold. All of them can
//! be stored; only the non-complex ones can be indexed.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::{FixedString, IndexValue, Operand};

/// Element type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Fixed-width byte string of `itemsize` bytes
    String { itemsize: usize },
    Complex64,
    Complex128,
}

impl ElementType {
    /// Width in bytes of one encoded element
    pub fn width(&self) -> usize {
        match self {
            ElementType::Bool | ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => 8,
            ElementType::Complex64 => 8,
            ElementType::Complex128 => 16,
            ElementType::String { itemsize } => *itemsize,
        }
    }

    /// Whether an index can be built over columns of this type
    pub fn is_indexable(&self) -> bool {
        !matches!(self, ElementType::Complex64 | ElementType::Complex128)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ElementType::Int8
                | ElementType::Int16
                | ElementType::Int32
                | ElementType::Int64
                | ElementType::UInt8
                | ElementType::UInt16
                | ElementType::UInt32
                | ElementType::UInt64
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            ElementType::Int8
                | ElementType::Int16
                | ElementType::Int32
                | ElementType::Int64
                | ElementType::Float32
                | ElementType::Float64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    /// Whether values of this type can be compared against `operand`.
    /// Complex values are unordered and accept nothing.
    pub fn accepts(&self, operand: &Operand) -> bool {
        match self {
            ElementType::Bool => bool::accepts(operand),
            ElementType::Int8 => i8::accepts(operand),
            ElementType::Int16 => i16::accepts(operand),
            ElementType::Int32 => i32::accepts(operand),
            ElementType::Int64 => i64::accepts(operand),
            ElementType::UInt8 => u8::accepts(operand),
            ElementType::UInt16 => u16::accepts(operand),
            ElementType::UInt32 => u32::accepts(operand),
            ElementType::UInt64 => u64::accepts(operand),
            ElementType::Float32 => f32::accepts(operand),
            ElementType::Float64 => f64::accepts(operand),
            ElementType::String { .. } => FixedString::accepts(operand),
            ElementType::Complex64 | ElementType::Complex128 => false,
        }
    }

    /// Short type name used in logs and manifests
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Bool => "bool",
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::UInt8 => "uint8",
            ElementType::UInt16 => "uint16",
            ElementType::UInt32 => "uint32",
            ElementType::UInt64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
            ElementType::String { .. } => "string",
            ElementType::Complex64 => "complex64",
            ElementType::Complex128 => "complex128",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::String { itemsize } => write!(f, "string[{}]", itemsize),
            other => write!(f, "{}", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_acceptance() {
        assert!(ElementType::Int8.accepts(&Operand::Float(1.5)));
        assert!(ElementType::Bool.accepts(&Operand::Int(1)));
        assert!(!ElementType::Float64.accepts(&Operand::Bytes(b"1".to_vec())));
        assert!(!ElementType::Complex64.accepts(&Operand::Float(0.0)));
        assert!(ElementType::String { itemsize: 2 }.accepts(&Operand::from("ab")));
    }

    #[test]
    fn test_widths() {
        assert_eq!(ElementType::Bool.width(), 1);
        assert_eq!(ElementType::Int16.width(), 2);
        assert_eq!(ElementType::Float64.width(), 8);
        assert_eq!(ElementType::String { itemsize: 4 }.width(), 4);
        assert_eq!(ElementType::Complex128.width(), 16);
    }

    #[test]
    fn test_complex_not_indexable() {
        assert!(!ElementType::Complex64.is_indexable());
        assert!(!ElementType::Complex128.is_indexable());
        assert!(ElementType::UInt64.is_indexable());
        assert!(ElementType::String { itemsize: 8 }.is_indexable());
    }

    #[test]
    fn test_serde_roundtrip() {
        let ty = ElementType::String { itemsize: 12 };
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, r#"{"kind":"string","itemsize":12}"#);
        let back: ElementType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
        assert_eq!(ty.to_string(), "string[12]");
    }
}

//! Typed values and the comparison contract shared by the index and the scanner
//!
//! `IndexValue` is implemented once per indexable element type. The index
//! core is generic over it, so the per-type comparison and encoding code is
//! chosen when an index is built or opened, never per row.
//!
//! Both the indexed path and the sequential scan compare column values to
//! query operands through `cmp_operand`, which keeps their results identical.
//! Floats compare with IEEE semantics except for NaN, which falls back to the
//! IEEE total order so that every comparison is defined.

use std::cmp::Ordering;
use std::fmt;

use super::element::ElementType;

/// A query operand, already typed by the expression evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Bool(bool),
    /// Any integer literal, widened
    Int(i128),
    Float(f64),
    Bytes(Vec<u8>),
}

impl Operand {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operand::Bool(_) => "bool",
            Operand::Int(_) => "int",
            Operand::Float(_) => "float",
            Operand::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Int(i) => write!(f, "{}", i),
            Operand::Float(x) => write!(f, "{}", x),
            Operand::Bytes(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Bool(v)
    }
}

macro_rules! operand_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Operand {
            fn from(v: $t) -> Self {
                Operand::Int(v as i128)
            }
        })*
    };
}

operand_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl From<f32> for Operand {
    fn from(v: f32) -> Self {
        Operand::Float(v as f64)
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Float(v)
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Operand::Bytes(v.as_bytes().to_vec())
    }
}

impl From<String> for Operand {
    fn from(v: String) -> Self {
        Operand::Bytes(v.into_bytes())
    }
}

impl From<&[u8]> for Operand {
    fn from(v: &[u8]) -> Self {
        Operand::Bytes(v.to_vec())
    }
}

/// Fixed-width byte string value. Trailing NUL padding is not significant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedString(Vec<u8>);

impl FixedString {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        let len = trimmed_len(&bytes);
        bytes.truncate(len);
        Self(bytes)
    }

    /// Builds a value that fits a column of `itemsize` bytes, truncating longer input.
    pub fn with_itemsize(bytes: impl Into<Vec<u8>>, itemsize: usize) -> Self {
        let mut bytes = bytes.into();
        bytes.truncate(itemsize);
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for FixedString {
    fn from(s: &str) -> Self {
        FixedString::new(s.as_bytes())
    }
}

impl fmt::Display for FixedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

fn trimmed_len(bytes: &[u8]) -> usize {
    bytes.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1)
}

/// IEEE comparison, with the total order deciding whenever NaN is involved.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Exact comparison of an integer against a float, without rounding the
/// integer to the nearest f64.
fn cmp_int_f64(i: i128, f: f64) -> Ordering {
    const LIMIT: f64 = 1.7014118346046923e38; // 2^127
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i128)) {
        Ordering::Equal => whole.partial_cmp(&f).unwrap_or(Ordering::Equal),
        other => other,
    }
}

/// Maps float bits onto an unsigned space that sorts like the floats do.
fn ordered_bits(bits: u64) -> u64 {
    if (bits >> 63) == 1 {
        !bits
    } else {
        bits ^ (1 << 63)
    }
}

/// Behavior an element type needs to be stored in a column index.
pub trait IndexValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Whether columns of `ty` hold values of this type
    fn matches(ty: &ElementType) -> bool;

    /// Order used to sort chunk contents
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Whether `operand` can be compared against this type
    fn accepts(operand: &Operand) -> bool;

    /// Compares against an operand. Monotone with respect to `total_cmp`.
    /// Returns `None` only when `accepts` is false.
    fn cmp_operand(&self, operand: &Operand) -> Option<Ordering>;

    /// Appends exactly `width` bytes
    fn encode(&self, width: usize, out: &mut Vec<u8>);

    /// Decodes from exactly `width` bytes
    fn decode(bytes: &[u8]) -> Self;

    /// Order-preserving (non-strict) projection onto f64, for overlap accounting
    fn magnitude(&self) -> f64;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_integer {
    ($t:ty, $variant:ident) => {
        impl IndexValue for $t {
            fn matches(ty: &ElementType) -> bool {
                matches!(ty, ElementType::$variant)
            }

            fn total_cmp(&self, other: &Self) -> Ordering {
                Ord::cmp(self, other)
            }

            fn accepts(operand: &Operand) -> bool {
                matches!(operand, Operand::Int(_) | Operand::Float(_))
            }

            fn cmp_operand(&self, operand: &Operand) -> Option<Ordering> {
                match operand {
                    Operand::Int(i) => Some((*self as i128).cmp(i)),
                    Operand::Float(f) => Some(cmp_int_f64(*self as i128, *f)),
                    _ => None,
                }
            }

            fn encode(&self, _width: usize, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn decode(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                <$t>::from_le_bytes(buf)
            }

            fn magnitude(&self) -> f64 {
                *self as f64
            }

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_integer!(i8, Int8);
impl_integer!(i16, Int16);
impl_integer!(i32, Int32);
impl_integer!(i64, Int64);
impl_integer!(u8, UInt8);
impl_integer!(u16, UInt16);
impl_integer!(u32, UInt32);
impl_integer!(u64, UInt64);

macro_rules! impl_float {
    ($t:ty, $variant:ident) => {
        impl IndexValue for $t {
            fn matches(ty: &ElementType) -> bool {
                matches!(ty, ElementType::$variant)
            }

            fn total_cmp(&self, other: &Self) -> Ordering {
                <$t>::total_cmp(self, other)
            }

            fn accepts(operand: &Operand) -> bool {
                matches!(operand, Operand::Int(_) | Operand::Float(_))
            }

            fn cmp_operand(&self, operand: &Operand) -> Option<Ordering> {
                match operand {
                    Operand::Float(f) => Some(cmp_f64(*self as f64, *f)),
                    Operand::Int(i) => Some(cmp_int_f64(*i, *self as f64).reverse()),
                    _ => None,
                }
            }

            fn encode(&self, _width: usize, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn decode(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                <$t>::from_le_bytes(buf)
            }

            fn magnitude(&self) -> f64 {
                ordered_bits((*self as f64).to_bits()) as f64
            }

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_float!(f32, Float32);
impl_float!(f64, Float64);

impl IndexValue for bool {
    fn matches(ty: &ElementType) -> bool {
        matches!(ty, ElementType::Bool)
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        Ord::cmp(self, other)
    }

    fn accepts(operand: &Operand) -> bool {
        matches!(operand, Operand::Bool(_) | Operand::Int(_))
    }

    fn cmp_operand(&self, operand: &Operand) -> Option<Ordering> {
        match operand {
            Operand::Bool(b) => Some(self.cmp(b)),
            Operand::Int(i) => Some((*self as i128).cmp(i)),
            _ => None,
        }
    }

    fn encode(&self, _width: usize, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn magnitude(&self) -> f64 {
        *self as u8 as f64
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl IndexValue for FixedString {
    fn matches(ty: &ElementType) -> bool {
        matches!(ty, ElementType::String { .. })
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }

    fn accepts(operand: &Operand) -> bool {
        matches!(operand, Operand::Bytes(_))
    }

    fn cmp_operand(&self, operand: &Operand) -> Option<Ordering> {
        match operand {
            Operand::Bytes(b) => Some(self.0.as_slice().cmp(&b[..trimmed_len(b)])),
            _ => None,
        }
    }

    fn encode(&self, width: usize, out: &mut Vec<u8>) {
        let n = self.0.len().min(width);
        out.extend_from_slice(&self.0[..n]);
        out.resize(out.len() + (width - n), 0);
    }

    fn decode(bytes: &[u8]) -> Self {
        FixedString::new(bytes)
    }

    fn magnitude(&self) -> f64 {
        let mut prefix = [0u8; 8];
        let n = self.0.len().min(8);
        prefix[..n].copy_from_slice(&self.0[..n]);
        u64::from_be_bytes(prefix) as f64
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// A single cell value as returned by row reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Str(FixedString),
    Complex64(f32, f32),
    Complex128(f64, f64),
}

impl Value {
    /// Shorthand for a string cell
    pub fn str(s: &str) -> Self {
        Value::Str(FixedString::from(s))
    }

    /// Compares this cell against a query operand.
    ///
    /// Complex cells are not ordered and never compare.
    pub fn cmp_operand(&self, operand: &Operand) -> Option<Ordering> {
        match self {
            Value::Bool(v) => v.cmp_operand(operand),
            Value::Int8(v) => v.cmp_operand(operand),
            Value::Int16(v) => v.cmp_operand(operand),
            Value::Int32(v) => v.cmp_operand(operand),
            Value::Int64(v) => v.cmp_operand(operand),
            Value::UInt8(v) => v.cmp_operand(operand),
            Value::UInt16(v) => v.cmp_operand(operand),
            Value::UInt32(v) => v.cmp_operand(operand),
            Value::UInt64(v) => v.cmp_operand(operand),
            Value::Float32(v) => v.cmp_operand(operand),
            Value::Float64(v) => v.cmp_operand(operand),
            Value::Str(v) => v.cmp_operand(operand),
            Value::Complex64(..) | Value::Complex128(..) => None,
        }
    }

    /// Whether this value has exactly the given element type
    pub fn is_of(&self, ty: &ElementType) -> bool {
        match (self, ty) {
            (Value::Str(s), ElementType::String { itemsize }) => s.len() <= *itemsize,
            (Value::Bool(_), ElementType::Bool)
            | (Value::Int8(_), ElementType::Int8)
            | (Value::Int16(_), ElementType::Int16)
            | (Value::Int32(_), ElementType::Int32)
            | (Value::Int64(_), ElementType::Int64)
            | (Value::UInt8(_), ElementType::UInt8)
            | (Value::UInt16(_), ElementType::UInt16)
            | (Value::UInt32(_), ElementType::UInt32)
            | (Value::UInt64(_), ElementType::UInt64)
            | (Value::Float32(_), ElementType::Float32)
            | (Value::Float64(_), ElementType::Float64)
            | (Value::Complex64(..), ElementType::Complex64)
            | (Value::Complex128(..), ElementType::Complex128) => true,
            _ => false,
        }
    }

    /// Converts to `ty` when no information is lost.
    ///
    /// Strings longer than the column itemsize are truncated, matching
    /// fixed-width storage.
    pub fn coerce(&self, ty: &ElementType) -> Option<Value> {
        if self.is_of(ty) {
            return Some(self.clone());
        }
        if let (Value::Str(s), ElementType::String { itemsize }) = (self, ty) {
            return Some(Value::Str(FixedString::with_itemsize(s.as_bytes(), *itemsize)));
        }
        if let Some(i) = self.as_i128() {
            return match ty {
                ElementType::Int8 => i8::try_from(i).ok().map(Value::Int8),
                ElementType::Int16 => i16::try_from(i).ok().map(Value::Int16),
                ElementType::Int32 => i32::try_from(i).ok().map(Value::Int32),
                ElementType::Int64 => i64::try_from(i).ok().map(Value::Int64),
                ElementType::UInt8 => u8::try_from(i).ok().map(Value::UInt8),
                ElementType::UInt16 => u16::try_from(i).ok().map(Value::UInt16),
                ElementType::UInt32 => u32::try_from(i).ok().map(Value::UInt32),
                ElementType::UInt64 => u64::try_from(i).ok().map(Value::UInt64),
                ElementType::Float64 if i.unsigned_abs() <= (1u128 << 53) => {
                    Some(Value::Float64(i as f64))
                }
                ElementType::Float32 if i.unsigned_abs() <= (1u128 << 24) => {
                    Some(Value::Float32(i as f32))
                }
                ElementType::Bool if i == 0 || i == 1 => Some(Value::Bool(i == 1)),
                _ => None,
            };
        }
        match (self, ty) {
            (Value::Float32(f), ElementType::Float64) => Some(Value::Float64(*f as f64)),
            (Value::Float64(f), ElementType::Float32) if (*f as f32) as f64 == *f || f.is_nan() => {
                Some(Value::Float32(*f as f32))
            }
            _ => None,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int8(v) => Some(*v as i128),
            Value::Int16(v) => Some(*v as i128),
            Value::Int32(v) => Some(*v as i128),
            Value::Int64(v) => Some(*v as i128),
            Value::UInt8(v) => Some(*v as i128),
            Value::UInt16(v) => Some(*v as i128),
            Value::UInt32(v) => Some(*v as i128),
            Value::UInt64(v) => Some(*v as i128),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Complex64(re, im) => write!(f, "{}+{}j", re, im),
            Value::Complex128(re, im) => write!(f, "{}+{}j", re, im),
        }
    }
}

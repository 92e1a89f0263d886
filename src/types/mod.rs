//! Element types and typed values
//!
//! - `ElementType`: the closed set of column types
//! - `IndexValue`: per-type ordering, operand comparison and encoding
//! - `Value` / `Operand`: row cells and query constants

mod element;
mod value;

pub use element::ElementType;
pub use value::{FixedString, IndexValue, Operand, Value};

//! Row storage and the indexed query surface

mod column;
mod indexed;
mod memory;

pub use column::{ColumnData, ColumnDesc, Schema};
pub use indexed::{IndexedTable, QueryOptions, QueryOutput};
pub use memory::{MemoryTable, RowSource};

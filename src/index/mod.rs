//! Column index lifecycle
//!
//! A `ColumnIndex` owns the chunk hierarchy of one column, its unindexed
//! tail and the chunk store behind both. `AnyIndex` erases the element type
//! so tables can hold indexes of different columns side by side.
//!
//! # Invariants
//!
//! - Every coordinate below `nrows` is in exactly one chunk or the tail
//! - Search results are the same before and after any optimize or fold
//! - A persisted index is readable only after its metadata is written

mod any;
mod column_index;
mod config;
mod errors;
mod manifest;

pub use any::AnyIndex;
pub use column_index::{ColumnIndex, FoldReport, IndexLocation, IndexStats, SearchOutcome};
pub use config::IndexConfig;
pub use errors::{IndexError, IndexResult};
pub use manifest::{read_meta, IndexMeta, INDEX_BLOBS, LEVELS_BLOB, META_BLOB, TAIL_BLOB};

//! coldex - chunked secondary indexes for columnar tables
//!
//! Values of one column are cut into sorted chunks, grouped into blocks and
//! superblocks that keep only `[min, max]` bounds. Range and equality
//! searches prune top-down through those bounds. An optimizer with levels
//! 0 to 9 reorganizes overlapping chunks, and a planner picks between an
//! indexed search and a sequential scan for each query.

pub mod chunk;
pub mod cli;
pub mod hierarchy;
pub mod index;
pub mod optimizer;
pub mod planner;
pub mod search;
pub mod table;
pub mod types;

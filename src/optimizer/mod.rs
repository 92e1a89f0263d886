//! Optimizer
//!
//! Levels 0..=9 trade build time for tighter chunk bounds. The optimizer
//! only regroups (value, coordinate) pairs between chunks; query results
//! never depend on the level.

mod optimizer;
mod schedule;

pub use optimizer::{optimize, OptimizeSummary};
pub use schedule::{MergeScope, Schedule, MAX_OPTLEVEL};

//! Query planner
//!
//! Decides per condition whether a query runs as an indexed search or a
//! sequential scan, and describes row windows for scans.
//!
//! # Invariants
//!
//! - Planning never fails: ineligible conditions are scanned
//! - Indexed and scanned execution return the same row set

mod condition;
mod errors;
mod planner;
mod window;

pub use condition::{CompareOp, Condition};
pub use errors::{QueryError, QueryResult};
pub use planner::{IndexMetadata, QueryPlan, QueryPlanner, ScanReason};
pub use window::{ResolvedWindow, RowWindow};

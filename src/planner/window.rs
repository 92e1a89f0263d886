//! Row windows with slice semantics
//!
//! `start` and `stop` may be negative to count from the end of the table and
//! are clamped to `0..=nrows`. Only positive steps are allowed.

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowWindow {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

/// A window resolved against a row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub start: u64,
    pub stop: u64,
    pub step: u64,
}

impl RowWindow {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn range(start: i64, stop: i64, step: i64) -> Self {
        Self::new(Some(start), Some(stop), Some(step))
    }

    /// Whether the window selects every row whatever the table size
    pub fn is_all(&self) -> bool {
        matches!(self.start, None | Some(0)) && self.stop.is_none() && matches!(self.step, None | Some(1))
    }

    pub fn resolve(&self, nrows: u64) -> QueryResult<ResolvedWindow> {
        let step = self.step.unwrap_or(1);
        if step <= 0 {
            return Err(QueryError::InvalidWindow(format!("step must be positive, got {}", step)));
        }
        let n = nrows as i64;
        let clamp = |i: i64| -> u64 {
            let i = if i < 0 { i + n } else { i };
            i.clamp(0, n) as u64
        };
        Ok(ResolvedWindow {
            start: self.start.map_or(0, clamp),
            stop: self.stop.map_or(nrows, clamp),
            step: step as u64,
        })
    }
}

impl ResolvedWindow {
    pub fn contains(&self, coord: u64) -> bool {
        coord >= self.start && coord < self.stop && (coord - self.start) % self.step == 0
    }

    /// Coordinates in window order
    pub fn iter(&self) -> impl Iterator<Item = u64> {
        let stop = self.stop.max(self.start);
        (self.start..stop).step_by(self.step as usize)
    }

    pub fn len(&self) -> u64 {
        if self.stop <= self.start {
            0
        } else {
            (self.stop - self.start + self.step - 1) / self.step
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

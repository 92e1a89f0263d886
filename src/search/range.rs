//! Value ranges with optional, inclusive or exclusive bounds

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::hierarchy::Bounds;
use crate::types::{IndexValue, Operand, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub operand: Operand,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(operand: impl Into<Operand>) -> Self {
        Self {
            operand: operand.into(),
            inclusive: true,
        }
    }

    pub fn exclusive(operand: impl Into<Operand>) -> Self {
        Self {
            operand: operand.into(),
            inclusive: false,
        }
    }
}

/// A range over column values. A missing side is unbounded.
///
/// An empty range (lower above upper) is valid and matches nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeSpec {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl RangeSpec {
    /// Every value
    pub fn all() -> Self {
        Self::default()
    }

    pub fn equal(v: impl Into<Operand>) -> Self {
        let v = v.into();
        Self {
            lower: Some(Bound::inclusive(v.clone())),
            upper: Some(Bound::inclusive(v)),
        }
    }

    pub fn lt(v: impl Into<Operand>) -> Self {
        Self {
            lower: None,
            upper: Some(Bound::exclusive(v)),
        }
    }

    pub fn le(v: impl Into<Operand>) -> Self {
        Self {
            lower: None,
            upper: Some(Bound::inclusive(v)),
        }
    }

    pub fn gt(v: impl Into<Operand>) -> Self {
        Self {
            lower: Some(Bound::exclusive(v)),
            upper: None,
        }
    }

    pub fn ge(v: impl Into<Operand>) -> Self {
        Self {
            lower: Some(Bound::inclusive(v)),
            upper: None,
        }
    }

    pub fn between(lower: Bound, upper: Bound) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn with_lower(mut self, bound: Bound) -> Self {
        self.lower = Some(bound);
        self
    }

    pub fn with_upper(mut self, bound: Bound) -> Self {
        self.upper = Some(bound);
        self
    }

    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.lower.iter().chain(self.upper.iter()).map(|b| &b.operand)
    }

    /// First operand the element type cannot compare against
    pub fn rejected_operand<T: IndexValue>(&self) -> Option<&Operand> {
        self.operands().find(|op| !T::accepts(op))
    }

    pub fn satisfies_lower<T: IndexValue>(&self, value: &T) -> bool {
        match &self.lower {
            None => true,
            Some(b) => passes_lower(value.cmp_operand(&b.operand), b.inclusive),
        }
    }

    pub fn satisfies_upper<T: IndexValue>(&self, value: &T) -> bool {
        match &self.upper {
            None => true,
            Some(b) => passes_upper(value.cmp_operand(&b.operand), b.inclusive),
        }
    }

    pub fn contains<T: IndexValue>(&self, value: &T) -> bool {
        self.satisfies_lower(value) && self.satisfies_upper(value)
    }

    /// Same test on an untyped cell, as used by sequential scans
    pub fn contains_value(&self, value: &Value) -> bool {
        let lower = match &self.lower {
            None => true,
            Some(b) => passes_lower(value.cmp_operand(&b.operand), b.inclusive),
        };
        lower
            && match &self.upper {
                None => true,
                Some(b) => passes_upper(value.cmp_operand(&b.operand), b.inclusive),
            }
    }

    /// Whether any value inside `bounds` can fall in the range.
    /// A node whose max equals an exclusive lower bound is skipped.
    pub fn may_intersect<T: IndexValue>(&self, bounds: &Bounds<T>) -> bool {
        self.satisfies_lower(&bounds.max) && self.satisfies_upper(&bounds.min)
    }

    /// Half-open index range of matches within a sorted run of values.
    pub fn match_range<T: IndexValue>(&self, sorted: &[T]) -> std::ops::Range<usize> {
        let start = sorted.partition_point(|v| !self.satisfies_lower(v));
        let end = sorted.partition_point(|v| self.satisfies_upper(v));
        start..end.max(start)
    }
}

fn passes_lower(ord: Option<Ordering>, inclusive: bool) -> bool {
    match ord {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => inclusive,
        _ => false,
    }
}

fn passes_upper(ord: Option<Ordering>, inclusive: bool) -> bool {
    match ord {
        Some(Ordering::Less) => true,
        Some(Ordering::Equal) => inclusive,
        _ => false,
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lower {
            Some(b) => write!(f, "{}{}", if b.inclusive { "[" } else { "(" }, b.operand)?,
            None => write!(f, "(-inf")?,
        }
        write!(f, ", ")?;
        match &self.upper {
            Some(b) => write!(f, "{}{}", b.operand, if b.inclusive { "]" } else { ")" }),
            None => write!(f, "+inf)"),
        }
    }
}

impl Serialize for RangeSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

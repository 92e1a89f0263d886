//! Index eligibility
//!
//! A condition can use an index when it is a single `<`, `<=`, `>`, `>=` or
//! `==` comparison, or the conjunction of one lower and one upper bound on
//! the same column, the column has an index, and indexing was not turned off
//! for the query. Everything else is scanned. Plans are terminal: once
//! chosen they are executed as-is.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::condition::{CompareOp, Condition};
use crate::search::{Bound, RangeSpec};
use crate::types::Operand;

/// Columns that currently have an index
#[derive(Debug, Clone, Default)]
pub struct IndexMetadata {
    pub indexed_columns: HashSet<String>,
}

impl IndexMetadata {
    pub fn with_indexes(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            indexed_columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexed_columns.contains(column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ScanReason {
    IndexingDisabled,
    NoIndex { column: String },
    MultipleColumns,
    UnsupportedOperator { op: String },
    Disjunction,
    Negation,
    /// Two terms that do not form a lower/upper pair
    NotARange,
    TooManyTerms,
    /// The index does not cover every row of the table
    StaleIndex { column: String },
}

impl fmt::Display for ScanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanReason::IndexingDisabled => write!(f, "indexing disabled for this query"),
            ScanReason::NoIndex { column } => write!(f, "column '{}' has no index", column),
            ScanReason::MultipleColumns => write!(f, "condition spans several columns"),
            ScanReason::UnsupportedOperator { op } => write!(f, "operator {} cannot use an index", op),
            ScanReason::Disjunction => write!(f, "disjunctions are scanned"),
            ScanReason::Negation => write!(f, "negations are scanned"),
            ScanReason::NotARange => write!(f, "terms do not form a range"),
            ScanReason::TooManyTerms => write!(f, "more than two terms"),
            ScanReason::StaleIndex { column } => write!(f, "index on '{}' does not cover the table", column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryPlan {
    Indexed { column: String, range: RangeSpec },
    Scanned { reason: ScanReason },
}

impl QueryPlan {
    pub fn uses_index(&self) -> bool {
        matches!(self, QueryPlan::Indexed { .. })
    }
}

pub struct QueryPlanner<'a> {
    index_metadata: &'a IndexMetadata,
    indexing_enabled: bool,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(index_metadata: &'a IndexMetadata) -> Self {
        Self {
            index_metadata,
            indexing_enabled: true,
        }
    }

    pub fn with_indexing(mut self, enabled: bool) -> Self {
        self.indexing_enabled = enabled;
        self
    }

    pub fn plan(&self, condition: &Condition) -> QueryPlan {
        let plan = self.choose(condition);
        match &plan {
            QueryPlan::Indexed { column, range } => {
                tracing::debug!(condition = %condition, column = %column, range = %range, "planned indexed search");
            }
            QueryPlan::Scanned { reason } => {
                tracing::debug!(condition = %condition, reason = %reason, "planned sequential scan");
            }
        }
        plan
    }

    fn choose(&self, condition: &Condition) -> QueryPlan {
        if !self.indexing_enabled {
            return scanned(ScanReason::IndexingDisabled);
        }
        let (column, range) = match extract_range(condition) {
            Ok(found) => found,
            Err(reason) => return scanned(reason),
        };
        if !self.index_metadata.is_indexed(column) {
            return scanned(ScanReason::NoIndex {
                column: column.to_string(),
            });
        }
        QueryPlan::Indexed {
            column: column.to_string(),
            range,
        }
    }
}

fn scanned(reason: ScanReason) -> QueryPlan {
    QueryPlan::Scanned { reason }
}

fn extract_range(condition: &Condition) -> Result<(&str, RangeSpec), ScanReason> {
    match condition {
        Condition::Compare { column, op, operand } => Ok((column.as_str(), single_range(*op, operand)?)),
        Condition::And(a, b) => {
            let (col_a, op_a, v_a) = term(a)?;
            let (col_b, op_b, v_b) = term(b)?;
            if col_a != col_b {
                return Err(ScanReason::MultipleColumns);
            }
            let (lower, upper) = if op_a.is_lower_bound() && op_b.is_upper_bound() {
                ((op_a, v_a), (op_b, v_b))
            } else if op_b.is_lower_bound() && op_a.is_upper_bound() {
                ((op_b, v_b), (op_a, v_a))
            } else if op_a == CompareOp::Ne || op_b == CompareOp::Ne {
                return Err(unsupported(CompareOp::Ne));
            } else {
                return Err(ScanReason::NotARange);
            };
            let range = RangeSpec::between(
                Bound {
                    operand: lower.1.clone(),
                    inclusive: lower.0 == CompareOp::Ge,
                },
                Bound {
                    operand: upper.1.clone(),
                    inclusive: upper.0 == CompareOp::Le,
                },
            );
            Ok((col_a, range))
        }
        Condition::Or(..) => Err(ScanReason::Disjunction),
        Condition::Not(..) => Err(ScanReason::Negation),
    }
}

fn term(condition: &Condition) -> Result<(&str, CompareOp, &Operand), ScanReason> {
    match condition {
        Condition::Compare { column, op, operand } => Ok((column.as_str(), *op, operand)),
        Condition::And(..) => Err(ScanReason::TooManyTerms),
        Condition::Or(..) => Err(ScanReason::Disjunction),
        Condition::Not(..) => Err(ScanReason::Negation),
    }
}

fn single_range(op: CompareOp, operand: &Operand) -> Result<RangeSpec, ScanReason> {
    let v = operand.clone();
    Ok(match op {
        CompareOp::Lt => RangeSpec::lt(v),
        CompareOp::Le => RangeSpec::le(v),
        CompareOp::Gt => RangeSpec::gt(v),
        CompareOp::Ge => RangeSpec::ge(v),
        CompareOp::Eq => RangeSpec::equal(v),
        CompareOp::Ne => return Err(unsupported(op)),
    })
}

fn unsupported(op: CompareOp) -> ScanReason {
    ScanReason::UnsupportedOperator {
        op: op.symbol().to_string(),
    }
}

//! Query error types
//!
//! Error codes:
//! - COLDEX_QUERY_UNKNOWN_COLUMN (REJECT)
//! - COLDEX_QUERY_INVALID_WINDOW (REJECT)
//! - COLDEX_QUERY_TYPE_MISMATCH (REJECT)
//! - COLDEX_QUERY_INVALID_ROW (REJECT)
//! - COLDEX_QUERY_COORDINATE_OUT_OF_RANGE (REJECT)
//! - COLDEX_QUERY_INDEX_EXISTS (REJECT)
//! - COLDEX_QUERY_NO_INDEX (REJECT)
//! - COLDEX_INDEX_* / COLDEX_STORAGE_* (see index errors)

use thiserror::Error;

use crate::index::IndexError;
use crate::types::ElementType;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("invalid row window: {0}")]
    InvalidWindow(String),

    #[error("column '{column}' of type {ty} cannot be compared with {operand}")]
    TypeMismatch {
        column: String,
        ty: ElementType,
        operand: String,
    },

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("coordinate {coord} is outside a table of {nrows} rows")]
    CoordinateOutOfRange { coord: u64, nrows: u64 },

    #[error("column '{0}' is already indexed")]
    IndexExists(String),

    #[error("column '{0}' has no index")]
    NoIndex(String),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnknownColumn(_) => "COLDEX_QUERY_UNKNOWN_COLUMN",
            QueryError::InvalidWindow(_) => "COLDEX_QUERY_INVALID_WINDOW",
            QueryError::TypeMismatch { .. } => "COLDEX_QUERY_TYPE_MISMATCH",
            QueryError::InvalidRow(_) => "COLDEX_QUERY_INVALID_ROW",
            QueryError::CoordinateOutOfRange { .. } => "COLDEX_QUERY_COORDINATE_OUT_OF_RANGE",
            QueryError::IndexExists(_) => "COLDEX_QUERY_INDEX_EXISTS",
            QueryError::NoIndex(_) => "COLDEX_QUERY_NO_INDEX",
            QueryError::Index(e) => e.code(),
        }
    }

    pub(crate) fn lock_poisoned(column: &str) -> Self {
        QueryError::Index(IndexError::Invariant(format!(
            "lock for index on '{}' is poisoned",
            column
        )))
    }
}

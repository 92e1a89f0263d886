//! Index error types
//!
//! Error codes:
//! - COLDEX_INDEX_UNSUPPORTED_TYPE (REJECT, nothing is left behind)
//! - COLDEX_INDEX_INVALID_BLOCK_SIZES (REJECT)
//! - COLDEX_INDEX_INVALID_OPTLEVEL (REJECT)
//! - COLDEX_INDEX_TYPE_MISMATCH (REJECT)
//! - COLDEX_INDEX_INVARIANT (FATAL)
//! - COLDEX_INDEX_MANIFEST (FATAL)
//! - COLDEX_INDEX_CONFIG (REJECT)
//! - COLDEX_STORAGE_* (see chunk store errors)

use thiserror::Error;

use crate::chunk::StorageError;
use crate::types::ElementType;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("column '{column}' has element type {ty}, which cannot be indexed")]
    UnsupportedType { column: String, ty: ElementType },

    #[error("invalid block sizes: {0}")]
    InvalidBlockSizes(String),

    #[error("optimization level {0} is outside 0..=9")]
    InvalidOptLevel(u8),

    #[error("operand {operand} cannot be compared with a {ty} column")]
    TypeMismatch { ty: ElementType, operand: String },

    #[error("index invariant violated: {0}")]
    Invariant(String),

    #[error("index manifest: {0}")]
    Manifest(String),

    #[error("index config: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IndexError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::UnsupportedType { .. } => "COLDEX_INDEX_UNSUPPORTED_TYPE",
            IndexError::InvalidBlockSizes(_) => "COLDEX_INDEX_INVALID_BLOCK_SIZES",
            IndexError::InvalidOptLevel(_) => "COLDEX_INDEX_INVALID_OPTLEVEL",
            IndexError::TypeMismatch { .. } => "COLDEX_INDEX_TYPE_MISMATCH",
            IndexError::Invariant(_) => "COLDEX_INDEX_INVARIANT",
            IndexError::Manifest(_) => "COLDEX_INDEX_MANIFEST",
            IndexError::Config(_) => "COLDEX_INDEX_CONFIG",
            IndexError::Storage(e) => e.code(),
        }
    }

    /// Whether the index must be rebuilt before further use
    pub fn invalidates_index(&self) -> bool {
        match self {
            IndexError::Invariant(_) | IndexError::Manifest(_) => true,
            IndexError::Storage(e) => e.is_fatal(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Manifest(e.to_string())
    }
}

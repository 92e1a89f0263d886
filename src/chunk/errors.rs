//! Chunk store error types
//!
//! Error codes:
//! - COLDEX_STORAGE_IO (ERROR)
//! - COLDEX_STORAGE_CORRUPTION (FATAL)
//! - COLDEX_STORAGE_STALE_CHUNK (FATAL)
//! - COLDEX_STORAGE_MISSING_CHUNK (FATAL)
//! - COLDEX_STORAGE_INVALID_FORMAT (FATAL)
//! - COLDEX_STORAGE_CHUNK_TOO_LARGE (ERROR)
//!
//! Any of these leaves the owning index indeterminate; it must be rebuilt.

use std::io;

use thiserror::Error;

/// Result type for chunk store operations
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("checksum mismatch in {0}")]
    Corruption(String),

    #[error("stale chunk reference for slot {slot}: expected generation {expected}, found {found}")]
    StaleChunk { slot: u32, expected: u32, found: u32 },

    #[error("chunk slot {0} does not exist")]
    MissingChunk(u32),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("chunk of {len} entries exceeds slot capacity {capacity}")]
    ChunkTooLarge { len: usize, capacity: usize },
}

impl StorageError {
    /// Wraps an I/O error with what was being attempted
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Io { .. } => "COLDEX_STORAGE_IO",
            StorageError::Corruption(_) => "COLDEX_STORAGE_CORRUPTION",
            StorageError::StaleChunk { .. } => "COLDEX_STORAGE_STALE_CHUNK",
            StorageError::MissingChunk(_) => "COLDEX_STORAGE_MISSING_CHUNK",
            StorageError::InvalidFormat(_) => "COLDEX_STORAGE_INVALID_FORMAT",
            StorageError::ChunkTooLarge { .. } => "COLDEX_STORAGE_CHUNK_TOO_LARGE",
        }
    }

    /// Whether the index must be considered invalid after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StorageError::ChunkTooLarge { .. })
    }
}

//! Chunk Store subsystem
//!
//! Chunks are the atomic unit of an index: fixed-capacity groups of
//! (value, coordinate) pairs, sorted by value. The store persists them in
//! slots and hands out generation-stamped references.
//!
//! # Invariants
//!
//! - A read returns exactly the entries last written to the slot
//! - A reference goes stale as soon as its slot is rewritten
//! - Write failures surface immediately; retries belong to the caller

mod checksum;
mod errors;
mod file;
mod memory;
mod store;

pub(crate) use checksum::{seal, unseal};
pub use errors::{StorageError, StorageResult};
pub use file::FileChunkStore;
pub use memory::MemoryChunkStore;
pub use store::{ChunkData, ChunkRef, ChunkStore};

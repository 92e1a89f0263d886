//! Chunk store contract
//!
//! A chunk store is an array of fixed-capacity slots. Each slot holds one
//! chunk: parallel `values` and `coords` vectors sorted by value. Slots are
//! addressed by `ChunkRef`, whose generation changes on every rewrite.

use std::cmp::Ordering;

use super::errors::StorageResult;
use crate::types::IndexValue;

/// Reference to a chunk slot at a specific generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRef {
    pub slot: u32,
    pub generation: u32,
}

impl ChunkRef {
    pub fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }
}

/// Contents of one chunk: (value, coordinate) pairs as parallel vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData<T> {
    pub values: Vec<T>,
    pub coords: Vec<u64>,
}

impl<T> Default for ChunkData<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            coords: Vec::new(),
        }
    }
}

impl<T: IndexValue> ChunkData<T> {
    pub fn new(values: Vec<T>, coords: Vec<u64>) -> Self {
        debug_assert_eq!(values.len(), coords.len());
        Self { values, coords }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            coords: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: T, coord: u64) {
        self.values.push(value);
        self.coords.push(coord);
    }

    /// Sorts by value, breaking ties by coordinate so the layout is deterministic.
    pub fn sort(&mut self) {
        let mut pairs: Vec<(T, u64)> = self
            .values
            .drain(..)
            .zip(self.coords.drain(..))
            .collect();
        pairs.sort_by(|a, b| cmp_entry(a, b));
        for (v, c) in pairs {
            self.values.push(v);
            self.coords.push(c);
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.values
            .windows(2)
            .all(|w| w[0].total_cmp(&w[1]) != Ordering::Greater)
    }

    /// First and last values. Only meaningful once sorted.
    pub fn min_max(&self) -> Option<(&T, &T)> {
        Some((self.values.first()?, self.values.last()?))
    }

    /// Merges two sorted chunks into one sorted chunk.
    pub fn merge(a: ChunkData<T>, b: ChunkData<T>) -> ChunkData<T> {
        let mut out = ChunkData::with_capacity(a.len() + b.len());
        let mut left = a.values.into_iter().zip(a.coords).peekable();
        let mut right = b.values.into_iter().zip(b.coords).peekable();
        loop {
            let take_left = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) => cmp_entry(l, r) != Ordering::Greater,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { left.next() } else { right.next() };
            if let Some((v, c)) = next {
                out.push(v, c);
            }
        }
        out
    }

    /// Splits off everything from `at` onwards.
    pub fn split_off(&mut self, at: usize) -> ChunkData<T> {
        ChunkData {
            values: self.values.split_off(at),
            coords: self.coords.split_off(at),
        }
    }
}

fn cmp_entry<T: IndexValue>(a: &(T, u64), b: &(T, u64)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Backing storage for the chunks of one column index.
///
/// Implementations are not internally synchronized for writes; the owning
/// index is driven by a single writer.
pub trait ChunkStore<T: IndexValue>: Send + Sync {
    /// Maximum entries per chunk
    fn capacity(&self) -> usize;

    /// Number of allocated slots
    fn chunk_count(&self) -> usize;

    /// Stores a chunk in a new slot.
    fn append_chunk(&mut self, chunk: &ChunkData<T>) -> StorageResult<ChunkRef>;

    /// Reads exactly the populated entries of a slot.
    fn read_chunk(&self, chunk: ChunkRef) -> StorageResult<ChunkData<T>>;

    /// Replaces a slot's contents, returning the reference to the new generation.
    /// The new contents may be shorter than the old ones.
    fn rewrite_chunk(&mut self, chunk: ChunkRef, data: &ChunkData<T>) -> StorageResult<ChunkRef>;

    /// Stores a named metadata blob, replacing any previous one.
    fn put_blob(&mut self, name: &str, bytes: &[u8]) -> StorageResult<()>;

    fn get_blob(&self, name: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Makes all previous writes durable.
    fn sync(&mut self) -> StorageResult<()>;

    /// Removes the chunks and the named blobs. Anything else the backing
    /// location holds is left alone.
    fn destroy(self: Box<Self>, blobs: &[&str]) -> StorageResult<()>;
}

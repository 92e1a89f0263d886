//! In-memory chunk store
//!
//! Used for transient indexes and tests. Rewrites replace the slot vector
//! wholesale, so no entry survives from a previous generation.

use std::collections::HashMap;

use super::errors::{StorageError, StorageResult};
use super::store::{ChunkData, ChunkRef, ChunkStore};
use crate::types::IndexValue;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    data: ChunkData<T>,
}

#[derive(Debug)]
pub struct MemoryChunkStore<T> {
    capacity: usize,
    slots: Vec<Slot<T>>,
    blobs: HashMap<String, Vec<u8>>,
}

impl<T: IndexValue> MemoryChunkStore<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::new(),
            blobs: HashMap::new(),
        }
    }

    fn slot(&self, chunk: ChunkRef) -> StorageResult<&Slot<T>> {
        let slot = self
            .slots
            .get(chunk.slot as usize)
            .ok_or(StorageError::MissingChunk(chunk.slot))?;
        if slot.generation != chunk.generation {
            return Err(StorageError::StaleChunk {
                slot: chunk.slot,
                expected: chunk.generation,
                found: slot.generation,
            });
        }
        Ok(slot)
    }

    fn check_len(&self, data: &ChunkData<T>) -> StorageResult<()> {
        if data.len() > self.capacity {
            return Err(StorageError::ChunkTooLarge {
                len: data.len(),
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl<T: IndexValue> ChunkStore<T> for MemoryChunkStore<T> {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn chunk_count(&self) -> usize {
        self.slots.len()
    }

    fn append_chunk(&mut self, chunk: &ChunkData<T>) -> StorageResult<ChunkRef> {
        self.check_len(chunk)?;
        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            data: chunk.clone(),
        });
        Ok(ChunkRef::new(slot, 0))
    }

    fn read_chunk(&self, chunk: ChunkRef) -> StorageResult<ChunkData<T>> {
        Ok(self.slot(chunk)?.data.clone())
    }

    fn rewrite_chunk(&mut self, chunk: ChunkRef, data: &ChunkData<T>) -> StorageResult<ChunkRef> {
        self.check_len(data)?;
        self.slot(chunk)?;
        let slot = &mut self.slots[chunk.slot as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.data = data.clone();
        Ok(ChunkRef::new(chunk.slot, slot.generation))
    }

    fn put_blob(&mut self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        self.blobs.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get_blob(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.blobs.get(name).cloned())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn destroy(self: Box<Self>, _blobs: &[&str]) -> StorageResult<()> {
        Ok(())
    }
}

//! File-backed chunk store
//!
//! Directory layout:
//!
//! ```text
//! <dir>/chunks.dat   header + array of fixed-size slots
//! <dir>/<blob>       named metadata blobs (meta.json, levels.dat, tail.dat)
//! ```
//!
//! `chunks.dat` header (24 bytes):
//!
//! ```text
//! | magic "CDXCHUNK" | version u32 | width u32 | capacity u32 | crc u32 |
//! ```
//!
//! Each slot is `4 + 4 + capacity * (width + 8) + 4` bytes:
//!
//! ```text
//! | generation u32 | len u32 | values[len] | coords[len] u64 | crc u32 | zero padding |
//! ```
//!
//! The CRC covers only the populated prefix, and reads stop at `len`, so a
//! slot rewritten with fewer entries never exposes the bytes it used to hold.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::checksum::{seal, unseal};
use super::errors::{StorageError, StorageResult};
use super::store::{ChunkData, ChunkRef, ChunkStore};
use crate::types::IndexValue;

const CHUNK_FILE: &str = "chunks.dat";
const MAGIC: &[u8; 8] = b"CDXCHUNK";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: u64 = 24;

pub struct FileChunkStore<T> {
    dir: PathBuf,
    file: Mutex<File>,
    width: usize,
    capacity: usize,
    slot_count: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: IndexValue> FileChunkStore<T> {
    /// Creates an empty store in `dir`, replacing any previous chunk file.
    pub fn create(dir: &Path, width: usize, capacity: usize) -> StorageResult<Self> {
        fs::create_dir_all(dir)
            .map_err(|e| StorageError::io(format!("create {}", dir.display()), e))?;
        let path = dir.join(CHUNK_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| StorageError::io(format!("create {}", path.display()), e))?;

        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        header.extend_from_slice(&(width as u32).to_le_bytes());
        header.extend_from_slice(&(capacity as u32).to_le_bytes());
        seal(&mut header);
        file.write_all(&header)
            .map_err(|e| StorageError::io("write chunk file header", e))?;

        tracing::debug!(dir = %dir.display(), width, capacity, "created chunk file");

        Ok(Self {
            dir: dir.to_path_buf(),
            file: Mutex::new(file),
            width,
            capacity,
            slot_count: 0,
            _marker: PhantomData,
        })
    }

    /// Opens an existing store, validating the header and slot framing.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        let path = dir.join(CHUNK_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::io(format!("open {}", path.display()), e))?;

        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)
            .map_err(|e| StorageError::io("read chunk file header", e))?;
        let payload = unseal(&header, "chunk file header")?;
        if &payload[0..8] != MAGIC {
            return Err(StorageError::InvalidFormat("bad chunk file magic".into()));
        }
        let version = read_u32(payload, 8);
        if version != FORMAT_VERSION {
            return Err(StorageError::InvalidFormat(format!(
                "unsupported chunk file version {}",
                version
            )));
        }
        let width = read_u32(payload, 12) as usize;
        let capacity = read_u32(payload, 16) as usize;

        let len = file
            .metadata()
            .map_err(|e| StorageError::io("stat chunk file", e))?
            .len();
        let slot_size = slot_size(width, capacity) as u64;
        let body = len.saturating_sub(HEADER_LEN);
        if body % slot_size != 0 {
            return Err(StorageError::InvalidFormat(format!(
                "chunk file body of {} bytes is not a whole number of {}-byte slots",
                body, slot_size
            )));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            file: Mutex::new(file),
            width,
            capacity,
            slot_count: (body / slot_size) as usize,
            _marker: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_size(&self) -> usize {
        slot_size(self.width, self.capacity)
    }

    fn offset(&self, slot: u32) -> u64 {
        HEADER_LEN + slot as u64 * self.slot_size() as u64
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, File>> {
        self.file.lock().map_err(|_| {
            StorageError::io(
                "lock chunk file",
                io::Error::new(io::ErrorKind::Other, "chunk file lock poisoned"),
            )
        })
    }

    fn encode_record(&self, generation: u32, data: &ChunkData<T>) -> StorageResult<Vec<u8>> {
        if data.len() > self.capacity {
            return Err(StorageError::ChunkTooLarge {
                len: data.len(),
                capacity: self.capacity,
            });
        }
        let mut buf = Vec::with_capacity(self.slot_size());
        buf.extend_from_slice(&generation.to_le_bytes());
        buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        for v in &data.values {
            v.encode(self.width, &mut buf);
        }
        for c in &data.coords {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        seal(&mut buf);
        buf.resize(self.slot_size(), 0);
        Ok(buf)
    }

    fn decode_record(&self, slot: u32, record: &[u8]) -> StorageResult<(u32, ChunkData<T>)> {
        let generation = read_u32(record, 0);
        let len = read_u32(record, 4) as usize;
        if len > self.capacity {
            return Err(StorageError::Corruption(format!(
                "chunk slot {} claims {} entries (capacity {})",
                slot, len, self.capacity
            )));
        }
        let populated = 8 + len * (self.width + 8) + 4;
        let payload = unseal(&record[..populated], &format!("chunk slot {}", slot))?;

        let mut data = ChunkData::with_capacity(len);
        let values_at = 8;
        let coords_at = values_at + len * self.width;
        for i in 0..len {
            let start = values_at + i * self.width;
            data.values.push(T::decode(&payload[start..start + self.width]));
        }
        for i in 0..len {
            data.coords.push(read_u64(payload, coords_at + i * 8));
        }
        Ok((generation, data))
    }

    fn write_slot(&self, file: &mut File, slot: u32, record: &[u8]) -> StorageResult<()> {
        file.seek(SeekFrom::Start(self.offset(slot)))
            .and_then(|_| file.write_all(record))
            .map_err(|e| StorageError::io(format!("write chunk slot {}", slot), e))
    }

    fn read_generation(&self, file: &mut File, slot: u32) -> StorageResult<u32> {
        let mut buf = [0u8; 4];
        file.seek(SeekFrom::Start(self.offset(slot)))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| StorageError::io(format!("read chunk slot {}", slot), e))?;
        Ok(u32::from_le_bytes(buf))
    }
}

fn slot_size(width: usize, capacity: usize) -> usize {
    4 + 4 + capacity * (width + 8) + 4
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(b)
}

impl<T: IndexValue> ChunkStore<T> for FileChunkStore<T> {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn chunk_count(&self) -> usize {
        self.slot_count
    }

    fn append_chunk(&mut self, chunk: &ChunkData<T>) -> StorageResult<ChunkRef> {
        let record = self.encode_record(0, chunk)?;
        let slot = self.slot_count as u32;
        {
            let mut file = self.lock()?;
            self.write_slot(&mut file, slot, &record)?;
        }
        self.slot_count += 1;
        Ok(ChunkRef::new(slot, 0))
    }

    fn read_chunk(&self, chunk: ChunkRef) -> StorageResult<ChunkData<T>> {
        if chunk.slot as usize >= self.slot_count {
            return Err(StorageError::MissingChunk(chunk.slot));
        }
        let mut record = vec![0u8; self.slot_size()];
        {
            let mut file = self.lock()?;
            file.seek(SeekFrom::Start(self.offset(chunk.slot)))
                .and_then(|_| file.read_exact(&mut record))
                .map_err(|e| StorageError::io(format!("read chunk slot {}", chunk.slot), e))?;
        }
        let (generation, data) = self.decode_record(chunk.slot, &record)?;
        if generation != chunk.generation {
            return Err(StorageError::StaleChunk {
                slot: chunk.slot,
                expected: chunk.generation,
                found: generation,
            });
        }
        Ok(data)
    }

    fn rewrite_chunk(&mut self, chunk: ChunkRef, data: &ChunkData<T>) -> StorageResult<ChunkRef> {
        if chunk.slot as usize >= self.slot_count {
            return Err(StorageError::MissingChunk(chunk.slot));
        }
        let generation = chunk.generation.wrapping_add(1);
        let record = self.encode_record(generation, data)?;
        let mut file = self.lock()?;
        let found = self.read_generation(&mut file, chunk.slot)?;
        if found != chunk.generation {
            return Err(StorageError::StaleChunk {
                slot: chunk.slot,
                expected: chunk.generation,
                found,
            });
        }
        self.write_slot(&mut file, chunk.slot, &record)?;
        Ok(ChunkRef::new(chunk.slot, generation))
    }

    fn put_blob(&mut self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));
        let write = || -> io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            fs::rename(&tmp, &path)
        };
        write().map_err(|e| StorageError::io(format!("write {}", path.display()), e))
    }

    fn get_blob(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(format!("read {}", path.display()), e)),
        }
    }

    fn sync(&mut self) -> StorageResult<()> {
        let file = self.lock()?;
        file.sync_all()
            .map_err(|e| StorageError::io("sync chunk file", e))
    }

    fn destroy(self: Box<Self>, blobs: &[&str]) -> StorageResult<()> {
        let dir = self.dir.clone();
        drop(self);
        let mut owned = vec![CHUNK_FILE.to_string()];
        for blob in blobs {
            owned.push(blob.to_string());
            owned.push(format!("{}.tmp", blob));
        }
        for name in &owned {
            let path = dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::io(format!("remove {}", path.display()), e)),
            }
        }

        // The directory goes only once nothing else lives in it
        let mut entries =
            fs::read_dir(&dir).map_err(|e| StorageError::io(format!("list {}", dir.display()), e))?;
        if entries.next().is_none() {
            fs::remove_dir(&dir).map_err(|e| StorageError::io(format!("remove {}", dir.display()), e))?;
        }
        Ok(())
    }
}

//! Column index lifecycle
//!
//! A `ColumnIndex` owns the sorted hierarchy of one column, the unindexed
//! tail of rows appended since the last fold, and the chunk store both
//! live in.
//!
//! # Invariants
//!
//! - Coordinates `0..nrows()` each appear exactly once across hierarchy and tail
//! - The optimization level only changes chunk grouping, never search results
//! - After a failed write the index is invalid until rebuilt
//!
//! Operations take `&mut self` for writes and `&self` for reads; callers
//! serialize writers per index.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use super::config::IndexConfig;
use super::errors::{IndexError, IndexResult};
use super::manifest::{decode_tail, encode_tail, IndexMeta, INDEX_BLOBS, LEVELS_BLOB, MANIFEST_VERSION, META_BLOB, TAIL_BLOB};
use crate::chunk::{ChunkData, ChunkStore, FileChunkStore, MemoryChunkStore, StorageResult};
use crate::hierarchy::{decode_levels, encode_levels, BlockSizes, Fanout, FoldSummary, Hierarchy, OverlapStats};
use crate::optimizer::{optimize, OptimizeSummary, MAX_OPTLEVEL};
use crate::search::{search, RangeSpec, SearchStats};
use crate::types::{ElementType, IndexValue};

/// Where a new index keeps its chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLocation {
    Memory,
    Dir(PathBuf),
}

impl IndexLocation {
    pub(crate) fn create<T: IndexValue>(&self, width: usize, capacity: usize) -> StorageResult<Box<dyn ChunkStore<T>>> {
        Ok(match self {
            IndexLocation::Memory => Box::new(MemoryChunkStore::new(capacity)),
            IndexLocation::Dir(dir) => Box::new(FileChunkStore::create(dir, width, capacity)?),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub column: String,
    pub element_type: ElementType,
    pub indexed_rows: u64,
    pub tail_rows: u64,
    pub dirty: bool,
    pub optlevel: u8,
    pub block_sizes: BlockSizes,
    pub fanout: Fanout,
    pub chunks: usize,
    pub blocks: usize,
    pub superblocks: usize,
    pub overlap: OverlapStats,
}

/// Outcome of folding the tail into the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FoldReport {
    pub rows_folded: usize,
    pub chunks_rewritten: usize,
    pub chunks_appended: usize,
    pub optimize: OptimizeSummary,
}

/// Search result split by where the matches came from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchOutcome {
    pub coords: Vec<u64>,
    pub stats: SearchStats,
    pub tail_matches: usize,
}

pub struct ColumnIndex<T: IndexValue> {
    column: String,
    ty: ElementType,
    optlevel: u8,
    auto_fold: bool,
    hierarchy: Hierarchy<T>,
    tail: ChunkData<T>,
    store: Box<dyn ChunkStore<T>>,
}

impl<T: IndexValue> ColumnIndex<T> {
    /// Bulk-builds an index over `values`, whose coordinates are their
    /// positions. Nothing is left behind when the build fails.
    pub fn build(
        column: &str,
        ty: ElementType,
        values: Vec<T>,
        config: &IndexConfig,
        location: &IndexLocation,
    ) -> IndexResult<Self> {
        config.validate()?;
        if !ty.is_indexable() {
            return Err(IndexError::UnsupportedType {
                column: column.to_string(),
                ty,
            });
        }
        if !T::matches(&ty) {
            return Err(IndexError::Invariant(format!(
                "values for column '{}' do not have type {}",
                column, ty
            )));
        }

        let rows = values.len() as u64;
        let sizes = config.resolve_block_sizes(rows, ty.width());
        sizes.validate()?;
        let mut store = location.create::<T>(ty.width(), sizes.chunk_size)?;

        let built = Self::build_into(sizes, values, config.optlevel, store.as_mut());
        let hierarchy = match built {
            Ok(h) => h,
            Err(e) => {
                if let Err(cleanup) = store.destroy(&INDEX_BLOBS) {
                    tracing::warn!(column, error = %cleanup, "failed to remove partial index");
                }
                return Err(e);
            }
        };

        tracing::info!(
            column,
            element_type = %ty,
            rows,
            chunk_size = sizes.chunk_size,
            block_size = sizes.block_size,
            superblock_size = sizes.superblock_size,
            chunks = hierarchy.chunks().len(),
            optlevel = config.optlevel,
            "built column index"
        );

        Ok(Self {
            column: column.to_string(),
            ty,
            optlevel: config.optlevel,
            auto_fold: config.auto_fold,
            hierarchy,
            tail: ChunkData::default(),
            store,
        })
    }

    fn build_into(
        sizes: BlockSizes,
        values: Vec<T>,
        optlevel: u8,
        store: &mut dyn ChunkStore<T>,
    ) -> IndexResult<Hierarchy<T>> {
        let coords = (0..values.len() as u64).collect();
        let mut hierarchy = Hierarchy::build(sizes, values, coords, store)?;
        optimize(&mut hierarchy, store, optlevel)?;
        Ok(hierarchy)
    }

    /// Reloads an index from the blobs `persist` wrote into `store`.
    pub fn open(store: Box<dyn ChunkStore<T>>) -> IndexResult<Self> {
        let meta_bytes = store
            .get_blob(META_BLOB)?
            .ok_or_else(|| IndexError::Manifest("missing meta.json".into()))?;
        let meta = IndexMeta::from_json(&meta_bytes)?;
        if !T::matches(&meta.element_type) {
            return Err(IndexError::Manifest(format!(
                "index holds {} values",
                meta.element_type
            )));
        }
        meta.block_sizes.validate()?;
        if store.capacity() != meta.block_sizes.chunk_size {
            return Err(IndexError::Manifest(format!(
                "chunk capacity {} does not match chunk size {}",
                store.capacity(),
                meta.block_sizes.chunk_size
            )));
        }

        let width = meta.element_type.width();
        let levels = store
            .get_blob(LEVELS_BLOB)?
            .ok_or_else(|| IndexError::Manifest("missing levels.dat".into()))?;
        let hierarchy = decode_levels(&levels, meta.block_sizes, width)?;
        let tail = match store.get_blob(TAIL_BLOB)? {
            Some(bytes) => decode_tail(&bytes, width)?,
            None => ChunkData::default(),
        };
        if hierarchy.nrows() != meta.indexed_rows || tail.len() as u64 != meta.tail_rows {
            return Err(IndexError::Manifest(format!(
                "manifest lists {} indexed and {} tail rows, found {} and {}",
                meta.indexed_rows,
                meta.tail_rows,
                hierarchy.nrows(),
                tail.len()
            )));
        }

        tracing::info!(
            column = %meta.column,
            element_type = %meta.element_type,
            rows = meta.total_rows(),
            "opened column index"
        );

        Ok(Self {
            column: meta.column,
            ty: meta.element_type,
            optlevel: meta.optlevel,
            auto_fold: meta.auto_fold,
            hierarchy,
            tail,
            store,
        })
    }

    /// Writes metadata, levels and tail, then syncs the store.
    pub fn persist(&mut self) -> IndexResult<()> {
        let width = self.ty.width();
        let meta = self.meta().to_json()?;
        self.store.put_blob(LEVELS_BLOB, &encode_levels(&self.hierarchy, width))?;
        self.store.put_blob(TAIL_BLOB, &encode_tail(&self.tail, width))?;
        self.store.sync()?;
        // Written last so a manifest always describes complete level files
        self.store.put_blob(META_BLOB, &meta)?;
        tracing::debug!(column = %self.column, "persisted column index");
        Ok(())
    }

    pub fn meta(&self) -> IndexMeta {
        IndexMeta {
            format_version: MANIFEST_VERSION,
            column: self.column.clone(),
            element_type: self.ty,
            block_sizes: self.hierarchy.sizes(),
            optlevel: self.optlevel,
            auto_fold: self.auto_fold,
            indexed_rows: self.hierarchy.nrows(),
            tail_rows: self.tail.len() as u64,
            dirty: self.is_dirty(),
        }
    }

    /// Appends rows to the tail. Their coordinates continue from `nrows()`.
    ///
    /// With auto-fold on, the tail is folded once it holds a full chunk.
    pub fn append(&mut self, values: Vec<T>) -> IndexResult<Option<FoldReport>> {
        let start = self.nrows();
        for (i, v) in values.into_iter().enumerate() {
            self.tail.push(v, start + i as u64);
        }
        if self.auto_fold && self.tail.len() >= self.hierarchy.sizes().chunk_size {
            return self.fold().map(Some);
        }
        Ok(None)
    }

    /// Merges the tail into the hierarchy and re-optimizes at the index's level.
    pub fn fold(&mut self) -> IndexResult<FoldReport> {
        let tail = std::mem::take(&mut self.tail);
        let FoldSummary {
            rows_folded,
            chunks_rewritten,
            chunks_appended,
        } = self.hierarchy.fold(tail, self.store.as_mut())?;
        let summary = optimize(&mut self.hierarchy, self.store.as_mut(), self.optlevel)?;

        if rows_folded > 0 {
            tracing::info!(
                column = %self.column,
                rows_folded,
                chunks_rewritten,
                chunks_appended,
                merges = summary.merges,
                "folded tail"
            );
        }
        Ok(FoldReport {
            rows_folded,
            chunks_rewritten,
            chunks_appended,
            optimize: summary,
        })
    }

    /// Re-optimizes at `level`, which becomes the index's level.
    pub fn optimize(&mut self, level: u8) -> IndexResult<OptimizeSummary> {
        if level > MAX_OPTLEVEL {
            return Err(IndexError::InvalidOptLevel(level));
        }
        let summary = optimize(&mut self.hierarchy, self.store.as_mut(), level)?;
        self.optlevel = level;
        Ok(summary)
    }

    /// Coordinates of all rows, indexed or not, whose value is in `range`.
    pub fn search(&self, range: &RangeSpec) -> IndexResult<Vec<u64>> {
        Ok(self.search_with_stats(range)?.coords)
    }

    pub fn search_with_stats(&self, range: &RangeSpec) -> IndexResult<SearchOutcome> {
        if let Some(op) = range.rejected_operand::<T>() {
            return Err(IndexError::TypeMismatch {
                ty: self.ty,
                operand: format!("{} {}", op.kind_name(), op),
            });
        }
        let (mut coords, stats) = search(&self.hierarchy, self.store.as_ref(), range)?;
        let before = coords.len();
        coords.extend(
            self.tail
                .values
                .iter()
                .zip(&self.tail.coords)
                .filter(|(v, _)| range.contains(*v))
                .map(|(_, c)| *c),
        );
        let tail_matches = coords.len() - before;
        Ok(SearchOutcome {
            coords,
            stats,
            tail_matches,
        })
    }

    /// Checks every structural invariant and the coordinate coverage.
    pub fn verify(&self) -> IndexResult<()> {
        let mut seen: HashSet<u64> = self.hierarchy.verify(self.store.as_ref())?;
        for c in &self.tail.coords {
            if !seen.insert(*c) {
                return Err(IndexError::Invariant(format!(
                    "tail coordinate {} is also indexed",
                    c
                )));
            }
        }
        let nrows = self.nrows();
        if seen.len() as u64 != nrows || seen.iter().any(|c| *c >= nrows) {
            return Err(IndexError::Invariant(format!(
                "coordinates do not cover 0..{}",
                nrows
            )));
        }
        Ok(())
    }

    pub fn stats(&self) -> IndexStats {
        let sizes = self.hierarchy.sizes();
        IndexStats {
            column: self.column.clone(),
            element_type: self.ty,
            indexed_rows: self.hierarchy.nrows(),
            tail_rows: self.tail.len() as u64,
            dirty: self.is_dirty(),
            optlevel: self.optlevel,
            block_sizes: sizes,
            fanout: sizes.fanout(self.hierarchy.nrows()),
            chunks: self.hierarchy.chunks().len(),
            blocks: self.hierarchy.blocks().len(),
            superblocks: self.hierarchy.superblocks().len(),
            overlap: self.hierarchy.overlap(),
        }
    }

    /// Removes every stored chunk and blob.
    pub fn destroy(self) -> IndexResult<()> {
        tracing::info!(column = %self.column, "dropped column index");
        self.store.destroy(&INDEX_BLOBS)?;
        Ok(())
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn element_type(&self) -> ElementType {
        self.ty
    }

    pub fn optlevel(&self) -> u8 {
        self.optlevel
    }

    pub fn block_sizes(&self) -> BlockSizes {
        self.hierarchy.sizes()
    }

    /// Rows covered, hierarchy and tail together
    pub fn nrows(&self) -> u64 {
        self.hierarchy.nrows() + self.tail.len() as u64
    }

    pub fn indexed_rows(&self) -> u64 {
        self.hierarchy.nrows()
    }

    pub fn tail_len(&self) -> usize {
        self.tail.len()
    }

    /// Whether rows were appended since the last fold
    pub fn is_dirty(&self) -> bool {
        !self.tail.is_empty()
    }

    pub fn hierarchy(&self) -> &Hierarchy<T> {
        &self.hierarchy
    }

    pub fn store(&self) -> &dyn ChunkStore<T> {
        self.store.as_ref()
    }
}

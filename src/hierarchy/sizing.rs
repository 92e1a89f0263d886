//! Block sizes and the sizing function
//!
//! Sizes are expressed in rows: a chunk holds `chunk_size` rows, a block
//! `block_size` rows, a superblock `superblock_size` rows. Each must be a
//! multiple of the next smaller one, which fixes the fan-out of every level.

use serde::{Deserialize, Serialize};

use crate::index::{IndexError, IndexResult};

/// Smallest chunk the sizing function will pick
pub const MIN_CHUNK_SIZE: usize = 64;

/// Largest fan-out the sizing function will pick
pub const MAX_FANOUT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSizes {
    pub superblock_size: usize,
    pub block_size: usize,
    pub chunk_size: usize,
}

impl BlockSizes {
    pub fn new(superblock_size: usize, block_size: usize, chunk_size: usize) -> IndexResult<Self> {
        let sizes = Self {
            superblock_size,
            block_size,
            chunk_size,
        };
        sizes.validate()?;
        Ok(sizes)
    }

    /// Tiny sizes that exercise every level with a handful of rows
    pub const fn small() -> Self {
        Self {
            superblock_size: 16,
            block_size: 8,
            chunk_size: 4,
        }
    }

    pub fn validate(&self) -> IndexResult<()> {
        if self.chunk_size == 0 || self.block_size == 0 || self.superblock_size == 0 {
            return Err(IndexError::InvalidBlockSizes(format!(
                "sizes must be positive: {:?}",
                self
            )));
        }
        if self.chunk_size > u32::MAX as usize {
            return Err(IndexError::InvalidBlockSizes(format!(
                "chunk size {} does not fit a slot header",
                self.chunk_size
            )));
        }
        if self.block_size % self.chunk_size != 0 {
            return Err(IndexError::InvalidBlockSizes(format!(
                "block size {} is not a multiple of chunk size {}",
                self.block_size, self.chunk_size
            )));
        }
        if self.superblock_size % self.block_size != 0 {
            return Err(IndexError::InvalidBlockSizes(format!(
                "superblock size {} is not a multiple of block size {}",
                self.superblock_size, self.block_size
            )));
        }
        Ok(())
    }

    pub fn chunks_per_block(&self) -> usize {
        self.block_size / self.chunk_size
    }

    pub fn blocks_per_superblock(&self) -> usize {
        self.superblock_size / self.block_size
    }

    /// The four level multipliers for an index of `rows` rows
    pub fn fanout(&self, rows: u64) -> Fanout {
        Fanout {
            rows_per_chunk: self.chunk_size,
            chunks_per_block: self.chunks_per_block(),
            blocks_per_superblock: self.blocks_per_superblock(),
            superblocks_at_root: div_ceil(rows, self.superblock_size as u64) as usize,
        }
    }
}

/// Multipliers between consecutive levels: chunk, block, superblock, root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fanout {
    pub rows_per_chunk: usize,
    pub chunks_per_block: usize,
    pub blocks_per_superblock: usize,
    pub superblocks_at_root: usize,
}

fn div_ceil(a: u64, b: u64) -> u64 {
    if b == 0 {
        0
    } else {
        (a + b - 1) / b
    }
}

fn prev_power_of_two(n: usize) -> usize {
    if n == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - n.leading_zeros())
    }
}

fn isqrt(n: u64) -> u64 {
    (n as f64).sqrt() as u64
}

/// Picks block sizes for an index of about `expected_rows` rows.
///
/// The chunk grows with the square root of the row count and is capped so
/// that four chunks (two merge inputs, the merged run and its split) fit in
/// `memory_budget_bytes`. Block and superblock fan-outs grow with the cube
/// root of the chunk count. Pure function of its inputs.
pub fn compute_block_sizes(
    expected_rows: u64,
    memory_budget_bytes: usize,
    element_width: usize,
) -> BlockSizes {
    let entry = element_width + 8;
    let memory_cap = prev_power_of_two((memory_budget_bytes / (4 * entry)).max(MIN_CHUNK_SIZE));

    let by_rows = (isqrt(expected_rows) as usize)
        .saturating_mul(16)
        .max(MIN_CHUNK_SIZE)
        .next_power_of_two();
    let chunk_size = by_rows.min(memory_cap).max(MIN_CHUNK_SIZE);

    let expected_chunks = div_ceil(expected_rows, chunk_size as u64).max(1);
    let fanout = ((expected_chunks as f64).cbrt().ceil() as usize)
        .next_power_of_two()
        .clamp(2, MAX_FANOUT);

    BlockSizes {
        superblock_size: chunk_size * fanout * fanout,
        block_size: chunk_size * fanout,
        chunk_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_sizes_are_valid() {
        let sizes = BlockSizes::small();
        sizes.validate().unwrap();
        assert_eq!(sizes.chunks_per_block(), 2);
        assert_eq!(sizes.blocks_per_superblock(), 2);
    }

    #[test]
    fn test_rejects_non_multiples() {
        let err = BlockSizes::new(16, 6, 4).unwrap_err();
        assert_eq!(err.code(), "COLDEX_INDEX_INVALID_BLOCK_SIZES");
        assert!(BlockSizes::new(20, 8, 4).is_err());
        assert!(BlockSizes::new(16, 8, 0).is_err());
    }

    #[test]
    fn test_fanout() {
        let fanout = BlockSizes::small().fanout(33);
        assert_eq!(fanout.rows_per_chunk, 4);
        assert_eq!(fanout.chunks_per_block, 2);
        assert_eq!(fanout.blocks_per_superblock, 2);
        assert_eq!(fanout.superblocks_at_root, 3);
    }

    #[test]
    fn test_computed_sizes_valid_and_monotone() {
        let mut last_chunk = 0;
        for rows in [0u64, 1, 1_000, 100_000, 10_000_000, 1_000_000_000] {
            let sizes = compute_block_sizes(rows, 64 << 20, 8);
            sizes.validate().unwrap();
            assert!(sizes.chunk_size >= last_chunk);
            assert!(sizes.chunk_size.is_power_of_two());
            last_chunk = sizes.chunk_size;
        }
    }

    #[test]
    fn test_memory_budget_caps_chunk() {
        let sizes = compute_block_sizes(1_000_000_000, 1 << 20, 8);
        assert!(sizes.chunk_size * 16 * 4 <= 1 << 20);
        let tiny = compute_block_sizes(1_000_000, 0, 8);
        assert_eq!(tiny.chunk_size, MIN_CHUNK_SIZE);
    }
}

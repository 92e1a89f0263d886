//! Sorted level hierarchy
//!
//! Chunk, block, superblock and root levels with `[min, max]` bounds, the
//! sizing function that fixes their fan-outs, and the level file codec.

mod bounds;
mod codec;
mod sizing;
mod tree;

pub use bounds::Bounds;
pub use codec::{decode_levels, encode_levels};
pub use sizing::{compute_block_sizes, BlockSizes, Fanout, MAX_FANOUT, MIN_CHUNK_SIZE};
pub use tree::{ChunkMeta, FoldSummary, Hierarchy, LevelNode, OverlapStats};

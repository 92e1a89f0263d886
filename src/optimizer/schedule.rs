//! Optimization levels
//!
//! Each level fixes how far apart two chunks may sit and still be merged,
//! and how many passes the optimizer may spend. Within a scope the work is
//! the same at every level; higher levels widen the scope or allow more
//! passes.

use serde::Serialize;

use crate::index::{IndexError, IndexResult};

pub const MAX_OPTLEVEL: u8 = 9;

/// Which chunks count as siblings for merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeScope {
    Block,
    Superblock,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub level: u8,
    pub scope: MergeScope,
    pub max_passes: usize,
}

impl Schedule {
    pub fn for_level(level: u8) -> IndexResult<Self> {
        let (scope, max_passes) = match level {
            0 => (MergeScope::Block, 0),
            1 => (MergeScope::Block, 1),
            2 => (MergeScope::Block, 2),
            3 => (MergeScope::Block, 4),
            4 => (MergeScope::Superblock, 2),
            5 => (MergeScope::Superblock, 4),
            6 => (MergeScope::Superblock, 8),
            7 => (MergeScope::Global, 4),
            8 => (MergeScope::Global, 16),
            9 => (MergeScope::Global, 256),
            other => return Err(IndexError::InvalidOptLevel(other)),
        };
        Ok(Self {
            level,
            scope,
            max_passes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(Schedule::for_level(0).unwrap().max_passes, 0);
        assert_eq!(Schedule::for_level(9).unwrap().scope, MergeScope::Global);
        let err = Schedule::for_level(10).unwrap_err();
        assert_eq!(err.code(), "COLDEX_INDEX_INVALID_OPTLEVEL");
    }

    #[test]
    fn test_budget_grows_within_scope() {
        let passes: Vec<usize> = (1..=3).map(|l| Schedule::for_level(l).unwrap().max_passes).collect();
        assert!(passes.windows(2).all(|w| w[0] < w[1]));
    }
}

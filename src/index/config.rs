//! Index build configuration
//!
//! Loaded from a JSON file; every field has a default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{IndexError, IndexResult};
use crate::hierarchy::{compute_block_sizes, BlockSizes};
use crate::optimizer::MAX_OPTLEVEL;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Optimization level used by build and fold (default 6)
    #[serde(default = "default_optlevel")]
    pub optlevel: u8,

    /// Working memory the sizing function may assume (default 64MB)
    #[serde(default = "default_memory_budget")]
    pub memory_budget_bytes: usize,

    /// Row count the sizing function plans for; the table size when absent
    #[serde(default)]
    pub expected_rows: Option<u64>,

    /// Explicit sizes, bypassing the sizing function
    #[serde(default)]
    pub block_sizes: Option<BlockSizes>,

    /// Fold the tail as soon as it holds a full chunk (default true)
    #[serde(default = "default_auto_fold")]
    pub auto_fold: bool,
}

fn default_optlevel() -> u8 {
    6
}

fn default_memory_budget() -> usize {
    64 * 1024 * 1024
}

fn default_auto_fold() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            optlevel: default_optlevel(),
            memory_budget_bytes: default_memory_budget(),
            expected_rows: None,
            block_sizes: None,
            auto_fold: default_auto_fold(),
        }
    }
}

impl IndexConfig {
    pub fn load(path: &Path) -> IndexResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| IndexError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: IndexConfig = serde_json::from_str(&content)
            .map_err(|e| IndexError::Config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> IndexResult<()> {
        if self.optlevel > MAX_OPTLEVEL {
            return Err(IndexError::InvalidOptLevel(self.optlevel));
        }
        if self.memory_budget_bytes == 0 {
            return Err(IndexError::Config("memory_budget_bytes must be > 0".into()));
        }
        if let Some(sizes) = &self.block_sizes {
            sizes.validate()?;
        }
        Ok(())
    }

    /// Test configuration: tiny blocks, no automatic folding
    pub fn small() -> Self {
        Self {
            block_sizes: Some(BlockSizes::small()),
            auto_fold: false,
            ..Self::default()
        }
    }

    pub fn with_optlevel(mut self, optlevel: u8) -> Self {
        self.optlevel = optlevel;
        self
    }

    pub fn with_block_sizes(mut self, sizes: BlockSizes) -> Self {
        self.block_sizes = Some(sizes);
        self
    }

    pub fn with_auto_fold(mut self, auto_fold: bool) -> Self {
        self.auto_fold = auto_fold;
        self
    }

    /// Sizes for a column of `element_width` bytes holding `rows` rows
    pub fn resolve_block_sizes(&self, rows: u64, element_width: usize) -> BlockSizes {
        match self.block_sizes {
            Some(sizes) => sizes,
            None => compute_block_sizes(
                self.expected_rows.unwrap_or(rows),
                self.memory_budget_bytes,
                element_width,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: IndexConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, IndexConfig::default());
        assert_eq!(config.optlevel, 6);
        assert!(config.auto_fold);
    }

    #[test]
    fn test_load_and_validate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"optlevel": 9, "block_sizes": {{"superblock_size": 16, "block_size": 8, "chunk_size": 4}}}}"#
        )
        .unwrap();
        let config = IndexConfig::load(file.path()).unwrap();
        assert_eq!(config.optlevel, 9);
        assert_eq!(config.resolve_block_sizes(1_000_000, 8), BlockSizes::small());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            IndexConfig::default().with_optlevel(10).validate().unwrap_err().code(),
            "COLDEX_INDEX_INVALID_OPTLEVEL"
        );
        let bad = IndexConfig {
            block_sizes: Some(BlockSizes {
                superblock_size: 10,
                block_size: 4,
                chunk_size: 4,
            }),
            ..IndexConfig::default()
        };
        assert!(bad.validate().is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert_eq!(
            IndexConfig::load(file.path()).unwrap_err().code(),
            "COLDEX_INDEX_CONFIG"
        );
    }
}

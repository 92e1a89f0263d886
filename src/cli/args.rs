//! CLI argument definitions using clap
//!
//! Commands:
//! - coldex inspect --dir <path>
//! - coldex verify --dir <path>
//! - coldex optimize --dir <path> --level <0-9>
//! - coldex demo [--rows N] [--seed S] [--optlevel L] [--dir <path>] [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// coldex - chunked secondary indexes for columnar tables
#[derive(Parser, Debug)]
#[command(name = "coldex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a persisted index summary as JSON
    Inspect {
        /// Index directory
        #[arg(long)]
        dir: PathBuf,
    },

    /// Check every structural invariant of a persisted index
    Verify {
        #[arg(long)]
        dir: PathBuf,
    },

    /// Reorganize a persisted index at the given level
    Optimize {
        #[arg(long)]
        dir: PathBuf,

        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,
    },

    /// Build a random int16 table and cross-check indexed and scanned queries
    Demo {
        #[arg(long, default_value_t = 10_000)]
        rows: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Overrides the level from the config file
        #[arg(long)]
        optlevel: Option<u8>,

        /// Persist the demo index here instead of keeping it in memory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Index configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

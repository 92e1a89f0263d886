//! CLI module for coldex
//!
//! Provides command-line interface for:
//! - inspect: Print a persisted index summary
//! - verify: Check a persisted index
//! - optimize: Reorganize a persisted index
//! - demo: Cross-check indexed and scanned queries on random data

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{demo, inspect, optimize, run_command, verify};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};

/// Parses arguments and runs the chosen command.
///
/// Failures are also reported as a JSON error line on stdout.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match run_command(cli.command) {
        Ok(()) => Ok(()),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

//! CLI-specific error types
//!
//! Library errors keep their own codes. Every CLI error ends the process.

use std::fmt;
use std::io;

use crate::index::IndexError;
use crate::planner::QueryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Indexed and scanned results differ
    Mismatch,
    /// Error raised by the index or query layer, with its code
    Library(&'static str),
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "COLDEX_CLI_CONFIG_ERROR",
            Self::IoError => "COLDEX_CLI_IO_ERROR",
            Self::Mismatch => "COLDEX_CLI_MISMATCH",
            Self::Library(code) => code,
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::Mismatch, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<IndexError> for CliError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Config(msg) => Self::config_error(msg),
            other => Self::new(CliErrorCode::Library(other.code()), other.to_string()),
        }
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Index(inner) => inner.into(),
            other => Self::new(CliErrorCode::Library(other.code()), other.to_string()),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

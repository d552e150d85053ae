use std::path::PathBuf;
use thiserror::Error;

use crate::core::{parser::ParseError, validator::ValidationError};

/// Errors that can occur while managing the codes file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Codes file does not exist.
    #[error("Codes file not found: {0}")]
    NotFound(PathBuf),
    /// Refused to overwrite an existing codes file.
    #[error("Codes file already exists: {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),
    /// Path could not be expanded or is not valid UTF-8.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    /// Codes file is syntactically invalid.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A code definition failed validation.
    #[error("Invalid code on line {line}: {source}")]
    Invalid {
        line: usize,
        #[source]
        source: ValidationError,
    },
    /// Atomic write operation failed.
    #[error("Atomic write failed: {0}")]
    WriteFailed(String),
    /// File watcher could not be set up.
    #[error("Failed to watch codes file: {0}")]
    Watch(#[from] notify::Error),
    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

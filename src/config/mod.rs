//! Codes file management.
//!
//! This module locates, reads, validates and initialises the codes file that
//! configures which secret codes are watched. Key features:
//!
//! - **Tilde expansion**: `~/.config/...` paths work everywhere
//! - **Fail-fast validation**: every code is validated on load, with its line
//! - **Atomic init**: the sample file is written temp-file-then-rename
//! - **Live reload**: a file watcher reports edits so codes can be re-subscribed
//!
//! # Example
//!
//! ```no_run
//! use cheat_codes::config::CodeBook;
//!
//! let book = CodeBook::new("~/.config/cheat-codes/codes.conf".into())?;
//! for entry in book.load()? {
//!     println!("line {}: {}", entry.line, entry.config);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod file_watcher;

use atomic_write_file::AtomicWriteFile;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::parser::{parse_codes_file, CodeEntry};
use crate::core::validator::{validate_config, ValidationError};

pub use error::ConfigError;
pub use file_watcher::FileWatcher;

/// Default location of the codes file.
pub const DEFAULT_CODES_PATH: &str = "~/.config/cheat-codes/codes.conf";

/// Content written by `CodeBook::init`.
pub const SAMPLE_CODES: &str = "\
# cheat-codes configuration
#
# code          = SEQUENCE
# code_span     = SEQUENCE, WHOLE_SEQUENCE_MS
# code_each     = SEQUENCE, PER_CHARACTER_MS
# code_combined = SEQUENCE, PER_CHARACTER_MS, OVERALL_MS
#
# Sequences are case-insensitive. $name = value defines a variable.

$window = 500

code          = iddqd
code_span     = xyzzy, 3000
code_each     = idkfa, $window
code_combined = open, $window, 5000
";

/// A code definition that failed validation, with its line.
#[derive(Debug, PartialEq)]
pub struct ValidationIssue {
    pub line: usize,
    pub error: ValidationError,
}

/// Codes that appear more than once, after case folding.
#[derive(Debug, PartialEq)]
pub struct DuplicateCode {
    /// Normalised sequence
    pub code: String,
    /// Lines defining it, in file order
    pub lines: Vec<usize>,
}

/// Expands `~` and environment variables in a path.
///
/// # Errors
///
/// Returns `ConfigError::InvalidPath` for non-UTF-8 paths or unknown
/// variables.
pub fn expand_path(path: &Path) -> Result<PathBuf, ConfigError> {
    let raw = path
        .to_str()
        .ok_or_else(|| ConfigError::InvalidPath(path.display().to_string()))?;

    let expanded =
        shellexpand::full(raw).map_err(|e| ConfigError::InvalidPath(e.to_string()))?;

    Ok(PathBuf::from(expanded.as_ref()))
}

/// Manages the codes file.
///
/// Read access goes through `read_codes` / `load`; the only write is the
/// atomic `init` of a sample file.
#[derive(Debug)]
pub struct CodeBook {
    /// Expanded path to the codes file.
    codes_path: PathBuf,
}

impl CodeBook {
    /// Opens an existing codes file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist, or
    /// `ConfigError::InvalidPath` if the path cannot be expanded.
    pub fn new(codes_path: PathBuf) -> Result<Self, ConfigError> {
        let codes_path = expand_path(&codes_path)?;

        if !codes_path.is_file() {
            return Err(ConfigError::NotFound(codes_path));
        }

        Ok(Self { codes_path })
    }

    /// Writes the sample codes file and opens it.
    ///
    /// Parent directories are created as needed. The write is atomic, so an
    /// interrupted init never leaves a truncated file behind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AlreadyExists` if the file exists and `force`
    /// is false, or `ConfigError::WriteFailed` if the write fails.
    pub fn init(codes_path: PathBuf, force: bool) -> Result<Self, ConfigError> {
        let codes_path = expand_path(&codes_path)?;

        if codes_path.exists() && !force {
            return Err(ConfigError::AlreadyExists(codes_path));
        }

        if let Some(parent) = codes_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = AtomicWriteFile::options().open(&codes_path).map_err(|e| {
            ConfigError::WriteFailed(format!("Failed to open for atomic write: {}", e))
        })?;

        file.write_all(SAMPLE_CODES.as_bytes())
            .map_err(|e| ConfigError::WriteFailed(format!("Failed to write content: {}", e)))?;

        file.commit().map_err(|e| {
            ConfigError::WriteFailed(format!("Failed to commit atomic write: {}", e))
        })?;

        tracing::debug!(path = %codes_path.display(), "sample codes file written");
        Ok(Self { codes_path })
    }

    /// Expanded path of the codes file.
    pub fn path(&self) -> &Path {
        &self.codes_path
    }

    /// Reads the raw codes file content.
    pub fn read_codes(&self) -> Result<String, ConfigError> {
        Ok(fs::read_to_string(&self.codes_path)?)
    }

    /// Parses the codes file without validating ranges.
    pub fn parse(&self) -> Result<Vec<CodeEntry>, ConfigError> {
        let content = self.read_codes()?;
        Ok(parse_codes_file(&content)?)
    }

    /// Parses and validates every code.
    ///
    /// # Errors
    ///
    /// Returns the first parse error, or `ConfigError::Invalid` for the
    /// first code that fails validation.
    pub fn load(&self) -> Result<Vec<CodeEntry>, ConfigError> {
        let entries = self.parse()?;

        if let Some(issue) = validate_entries(&entries).into_iter().next() {
            return Err(ConfigError::Invalid {
                line: issue.line,
                source: issue.error,
            });
        }

        Ok(entries)
    }

    /// Starts watching the codes file for edits.
    pub fn watch(&self) -> Result<FileWatcher, ConfigError> {
        FileWatcher::new(self.codes_path.clone())
    }
}

/// Validates every entry, collecting all failures.
pub fn validate_entries(entries: &[CodeEntry]) -> Vec<ValidationIssue> {
    entries
        .iter()
        .filter_map(|entry| {
            validate_config(&entry.config)
                .err()
                .map(|error| ValidationIssue {
                    line: entry.line,
                    error,
                })
        })
        .collect()
}

/// Finds codes defined more than once (case-insensitively).
///
/// Duplicates are legal, each one fires independently, but are almost
/// always a mistake worth reporting.
pub fn find_duplicates(entries: &[CodeEntry]) -> Vec<DuplicateCode> {
    let mut lines_by_code: HashMap<String, Vec<usize>> = HashMap::new();
    for entry in entries {
        lines_by_code
            .entry(entry.config.normalized_code())
            .or_default()
            .push(entry.line);
    }

    let mut duplicates: Vec<DuplicateCode> = lines_by_code
        .into_iter()
        .filter(|(_, lines)| lines.len() > 1)
        .map(|(code, lines)| DuplicateCode { code, lines })
        .collect();

    duplicates.sort_by_key(|dup| dup.lines[0]);
    duplicates
}

#[cfg(test)]
mod tests;

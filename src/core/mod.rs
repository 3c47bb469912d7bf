//! Core error types and result aliases.

use std::{fmt, io, path::Path, path::PathBuf, result};

use thiserror::Error;

/// Error types for the confmend subsystem.
///
/// Covers configuration loading, dot-path access, file watching and
/// report export failures. Validation findings are never errors; they
/// surface as `ValidationIssue`s through the report API instead.
#[derive(Error, Debug)]
pub enum ConfmendError {
    /// Configuration file could not be read
    #[error("failed to read config file '{path}': {details}")]
    ConfigRead {
        /// Path of the file that failed to load
        path: PathBuf,
        /// Read error details
        details: String,
    },

    /// TOML parsing error with location context
    #[error("failed to parse TOML at '{location}': {details}")]
    TomlParse {
        /// Location of TOML being parsed (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },

    /// The specified dot-separated path cannot be resolved
    #[error("invalid config path: {0}")]
    InvalidPath(String),

    /// File watcher failed to start or stop
    #[error("watcher {operation} failed: {details}")]
    Watcher {
        /// The lifecycle operation that failed (start, stop)
        operation: String,
        /// Watcher error details
        details: String,
    },

    /// A report export could not be written
    #[error("failed to export report to '{path}': {details}")]
    Export {
        /// Destination path of the export
        path: PathBuf,
        /// Export error details
        details: String,
    },

    /// Standard I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A specialized `Result` type for confmend operations.
pub type Result<T> = result::Result<T, ConfmendError>;

impl ConfmendError {
    /// Creates a TOML parsing error with optional file path context.
    ///
    /// # Arguments
    ///
    /// * `error` - The underlying parsing error
    /// * `path` - Optional path to the file that failed to parse
    pub fn toml_parse(error: impl fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => {
                let clean_path = p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
                clean_path.to_string_lossy().to_string()
            }
            None => "string".to_string(),
        };

        ConfmendError::TomlParse {
            location,
            details: error.to_string(),
        }
    }

    /// Creates a config read error with file path context.
    pub fn config_read(error: impl fmt::Display, path: &Path) -> Self {
        ConfmendError::ConfigRead {
            path: path.to_path_buf(),
            details: error.to_string(),
        }
    }

    /// Creates a watcher lifecycle error.
    pub fn watcher(operation: &str, error: impl fmt::Display) -> Self {
        ConfmendError::Watcher {
            operation: operation.to_string(),
            details: error.to_string(),
        }
    }
}

//! Core types for the plugin.

use std::path::PathBuf;

use sova2coin_core::CoreError;
use sova2coin_ops::OpsError;
use sova2coin_scan::ScanError;
use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur in the plugin.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Invalid plugin or bidsmap configuration.
    #[error("Invalid plugin configuration: {message}")]
    ConfigError { message: String },

    /// A rules file could not be loaded or applied.
    #[error("Invalid rules in {path}: {message}")]
    RulesError { path: PathBuf, message: String },

    /// The signal reader failed to open a recording.
    #[error("Failed to read {path}: {message}")]
    ReadError { path: PathBuf, message: String },

    /// The BIDS writer failed.
    #[error("Failed to write {path}: {message}")]
    WriteError { path: PathBuf, message: String },

    /// Metadata tree error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Session walk error.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Provenance store error.
    #[error(transparent)]
    Ops(#[from] OpsError),

    /// IO error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PluginError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a reader error for `path`.
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReadError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a writer error for `path`.
    pub fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_errors_keep_their_message() {
        let err: PluginError = CoreError::invalid_key("a..b").into();
        assert!(err.to_string().contains("a..b"));

        let err: PluginError = ScanError::NotADirectory {
            path: PathBuf::from("/data/x.vhdr"),
        }
        .into();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_reader_error() {
        let err = PluginError::read("/data/x.vhdr", "truncated header");
        assert!(matches!(err, PluginError::ReadError { .. }));
        assert!(err.to_string().contains("truncated header"));
    }
}

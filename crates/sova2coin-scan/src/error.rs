//! Error and warning types for session walking.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a walk.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// An ignore pattern could not be compiled.
    #[error("Invalid ignore pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Kind of walk warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A hidden file or directory was skipped.
    HiddenFile,
    /// Error reading a directory entry.
    ReadError,
}

/// Non-fatal condition encountered while walking a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl WalkWarning {
    /// Create a new walk warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a hidden file warning.
    pub fn hidden(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Ignoring hidden file: {}", path.display()),
            path,
            kind: WarningKind::HiddenFile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn test_hidden_warning() {
        let warning = WalkWarning::hidden("/data/sub-01/.DS_Store");
        assert_eq!(warning.kind, WarningKind::HiddenFile);
        assert!(warning.message.contains("Ignoring hidden file"));
    }
}

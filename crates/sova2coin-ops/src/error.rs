//! Error types for file operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while mirroring files into the provenance store.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The file does not live below the store's source root.
    #[error("{path} is not inside the provenance source folder {root}")]
    OutsideSource { path: PathBuf, root: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OpsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

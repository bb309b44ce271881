//! Error types for metadata tree operations.

use thiserror::Error;

/// Errors raised by the metadata tree utilities.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A scalar was handed to an operation that needs a tree at the root.
    #[error("Cannot flatten a scalar value ({value}): the root must be a tree")]
    NotATree { value: String },

    /// A dotted key had an empty segment, or a tree key was empty or dotted.
    #[error("Invalid dotted key: '{key}'")]
    InvalidKey { key: String },
}

impl CoreError {
    /// Create an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_tree_message() {
        let err = CoreError::NotATree {
            value: "2500".to_string(),
        };
        assert!(err.to_string().contains("root must be a tree"));
    }

    #[test]
    fn test_invalid_key() {
        let err = CoreError::invalid_key("sidecar..x");
        assert!(matches!(err, CoreError::InvalidKey { .. }));
        assert!(err.to_string().contains("sidecar..x"));
    }
}

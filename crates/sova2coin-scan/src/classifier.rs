//! Source file classification by extension.

use std::collections::BTreeSet;
use std::path::Path;

use sova2coin_core::PluginOptions;

/// Dataformat tag for EEG recordings.
pub const EEG: &str = "EEG";

/// Extensions the signal readers can open.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".set", ".cnt", ".vhdr", ".bdf", ".fif", ".edf"];

/// Registry of supported file extensions.
///
/// Extensions are stored lowercase with their leading dot and matched
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedExtensions {
    extensions: BTreeSet<String>,
}

impl SupportedExtensions {
    /// Create a registry from a list of extensions such as `".vhdr"`.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Check if the extension of `path` is registered.
    pub fn contains_path(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Iterate over the registered extensions.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for SupportedExtensions {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// Decides which dataformat, if any, a file belongs to.
pub trait SourceClassifier {
    /// Return the dataformat tag of `path`, or `""` if it is not a source file.
    fn classify(&self, path: &Path) -> &'static str;

    /// Check if `path` is a source file of any dataformat.
    fn is_supported(&self, path: &Path) -> bool {
        !self.classify(path).is_empty()
    }
}

/// Classifier tagging every registered extension as [`EEG`].
#[derive(Debug, Clone, Default)]
pub struct EegClassifier {
    extensions: SupportedExtensions,
}

impl EegClassifier {
    /// Create a classifier with the default registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with a custom registry.
    pub fn with_extensions(extensions: SupportedExtensions) -> Self {
        Self { extensions }
    }

    /// Create a classifier honouring the `extensions` plugin option.
    pub fn from_options(options: &PluginOptions) -> Self {
        match &options.extensions {
            Some(extensions) => Self::with_extensions(SupportedExtensions::new(extensions)),
            None => Self::default(),
        }
    }

    /// The registry in use.
    pub fn extensions(&self) -> &SupportedExtensions {
        &self.extensions
    }
}

impl SourceClassifier for EegClassifier {
    fn classify(&self, path: &Path) -> &'static str {
        if self.extensions.contains_path(path) {
            EEG
        } else {
            ""
        }
    }
}

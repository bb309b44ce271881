//! Source file classification and session walking for sova2coin.
//!
//! This crate decides which files of a session folder are source
//! recordings and collects them using jwalk for traversal.
//!
//! # Overview
//!
//! - [`EegClassifier`] tags files whose extension is in a
//!   [`SupportedExtensions`] registry as [`EEG`].
//! - [`SourceWalker`] walks a session recursively, in sorted order, and
//!   keeps the files of one dataformat. Hidden files are skipped with a
//!   warning.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sova2coin_scan::{EEG, EegClassifier, SourceWalker};
//!
//! let walker = SourceWalker::new();
//! let report = walker
//!     .walk(Path::new("/data/raw/sub-01"), &EegClassifier::new(), EEG)
//!     .unwrap();
//!
//! for file in &report.files {
//!     println!("{}", file.display());
//! }
//! ```

mod classifier;
mod error;
mod walker;

pub use classifier::{DEFAULT_EXTENSIONS, EEG, EegClassifier, SourceClassifier, SupportedExtensions};
pub use error::{ScanError, WalkWarning, WarningKind};
pub use walker::{SourceWalker, WalkConfig, WalkConfigBuilder, WalkReport, list_dirs};

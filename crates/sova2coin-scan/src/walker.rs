//! JWalk-based session walker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};
use tracing::{debug, warn};

use crate::classifier::SourceClassifier;
use crate::error::{ScanError, WalkWarning, WarningKind};

/// Configuration for walking a session folder.
#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into), default)]
pub struct WalkConfig {
    /// Follow symbolic links.
    pub follow_symlinks: bool,

    /// Maximum depth to traverse (None = unlimited).
    pub max_depth: Option<usize>,

    /// File or directory names to skip (glob syntax).
    pub ignore_patterns: Vec<String>,
}

impl WalkConfig {
    /// Create a new walk config builder.
    pub fn builder() -> WalkConfigBuilder {
        WalkConfigBuilder::default()
    }

    fn ignore_set(&self) -> Result<GlobSet, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| ScanError::InvalidPattern {
            pattern: self.ignore_patterns.join(","),
            message: e.to_string(),
        })
    }
}

/// Source files found below a session folder.
#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    /// Matching files in sorted path order.
    pub files: Vec<PathBuf>,
    /// Skipped hidden files and unreadable entries.
    pub warnings: Vec<WalkWarning>,
}

impl WalkReport {
    /// Number of hidden entries that were skipped.
    pub fn hidden_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| w.kind == WarningKind::HiddenFile)
            .count()
    }
}

/// Serial walker collecting the source files of one dataformat.
#[derive(Debug, Clone, Default)]
pub struct SourceWalker {
    config: WalkConfig,
}

impl SourceWalker {
    /// Create a walker with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a walker with a custom configuration.
    pub fn with_config(config: WalkConfig) -> Self {
        Self { config }
    }

    /// Recursively collect every file below `root` classified as `dataformat`.
    ///
    /// Hidden files and directories are skipped with a warning; hidden
    /// directories are not descended into.
    pub fn walk(
        &self,
        root: &Path,
        classifier: &dyn SourceClassifier,
        dataformat: &str,
    ) -> Result<WalkReport, ScanError> {
        check_dir(root)?;
        let ignore = Arc::new(self.config.ignore_set()?);
        let walker = self.walk_dir(root, Arc::clone(&ignore));

        let mut report = WalkReport::default();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    warn!(path = %path.display(), "Unreadable entry: {err}");
                    report
                        .warnings
                        .push(WalkWarning::new(path, err.to_string(), WarningKind::ReadError));
                    continue;
                }
            };

            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().to_string();

            if is_hidden_name(&file_name) {
                warn!("Ignoring hidden file: {}", path.display());
                report.warnings.push(WalkWarning::hidden(&path));
                continue;
            }

            if ignore.is_match(&file_name) {
                debug!("Ignoring {} (matches ignore pattern)", path.display());
                continue;
            }

            if !entry.file_type().is_file() && !(self.config.follow_symlinks && path.is_file()) {
                continue;
            }

            if !dataformat.is_empty() && classifier.classify(&path) == dataformat {
                report.files.push(path);
            }
        }

        debug!(
            root = %root.display(),
            files = report.files.len(),
            warnings = report.warnings.len(),
            "Walked session"
        );
        Ok(report)
    }

    /// Find the first source file below `root` and its dataformat.
    ///
    /// Hidden entries and names matching an ignore pattern are passed over.
    pub fn probe(
        &self,
        root: &Path,
        classifier: &dyn SourceClassifier,
    ) -> Result<Option<(PathBuf, &'static str)>, ScanError> {
        check_dir(root)?;
        let ignore = Arc::new(self.config.ignore_set()?);

        for entry in self.walk_dir(root, Arc::clone(&ignore)).into_iter().flatten() {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if is_hidden_name(&file_name) || ignore.is_match(&file_name) {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let dataformat = classifier.classify(&path);
            if !dataformat.is_empty() {
                return Ok(Some((path, dataformat)));
            }
        }
        Ok(None)
    }

    /// Build the jwalk iterator.
    ///
    /// Hidden and ignored directories below `root` are not descended into.
    /// The root itself is always read, whatever its name.
    fn walk_dir(&self, root: &Path, ignore: Arc<GlobSet>) -> WalkDir {
        WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(self.config.follow_symlinks)
            .min_depth(1)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .process_read_dir(move |depth, _path, _state, children| {
                if depth.is_none() {
                    return;
                }
                for entry in children.iter_mut().flatten() {
                    if !entry.file_type.is_dir() {
                        continue;
                    }
                    let name = entry.file_name.to_string_lossy();
                    if is_hidden_name(&name) || ignore.is_match(name.as_ref()) {
                        entry.read_children_path = None;
                    }
                }
            })
    }

    /// Return the `index`-th source file directly inside `folder`.
    ///
    /// Only the folder itself is listed, not its subfolders.
    pub fn source_file_in(
        &self,
        folder: &Path,
        classifier: &dyn SourceClassifier,
        index: usize,
    ) -> Result<Option<PathBuf>, ScanError> {
        let mut seen = 0;
        for path in list_entries(folder)? {
            if file_stem_is_hidden(&path) {
                warn!("Ignoring hidden file: {}", path.display());
                continue;
            }
            if path.is_file() && classifier.is_supported(&path) {
                if seen == index {
                    return Ok(Some(path));
                }
                seen += 1;
            }
        }
        Ok(None)
    }

    /// Collect the first source file of every immediate subfolder of `session`.
    ///
    /// This is the shallow enumeration the recursive [`SourceWalker::walk`]
    /// replaced; it misses recordings nested more than one level deep.
    pub fn first_per_folder(
        &self,
        session: &Path,
        classifier: &dyn SourceClassifier,
        dataformat: &str,
    ) -> Result<WalkReport, ScanError> {
        let mut report = WalkReport::default();
        for folder in list_dirs(session)? {
            if let Some(file) = self.source_file_in(&folder, classifier, 0)? {
                if classifier.classify(&file) == dataformat {
                    report.files.push(file);
                }
            }
        }
        Ok(report)
    }
}

/// List the non-hidden immediate subdirectories of `folder`, sorted.
pub fn list_dirs(folder: &Path) -> Result<Vec<PathBuf>, ScanError> {
    Ok(list_entries(folder)?
        .into_iter()
        .filter(|p| p.is_dir())
        .filter(|p| !p.file_name().is_some_and(|n| is_hidden_name(&n.to_string_lossy())))
        .collect())
}

fn list_entries(folder: &Path) -> Result<Vec<PathBuf>, ScanError> {
    check_dir(folder)?;
    let mut entries = Vec::new();
    for entry in WalkDir::new(folder)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(false)
        .min_depth(1)
        .max_depth(1)
    {
        let entry = entry.map_err(|e| {
            ScanError::io(
                folder,
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop")),
            )
        })?;
        entries.push(entry.path());
    }
    Ok(entries)
}

fn check_dir(path: &Path) -> Result<(), ScanError> {
    let metadata = std::fs::metadata(path).map_err(|e| ScanError::io(path, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

fn file_stem_is_hidden(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| is_hidden_name(&stem.to_string_lossy()))
}

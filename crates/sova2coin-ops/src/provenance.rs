//! Mirrored copies of discovered source files.

use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OpsError;

/// A source-root/target-root pair.
///
/// Every file mirrored into the store keeps its path relative to `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceStore {
    /// Root of the original source data.
    pub source: PathBuf,
    /// Root the copies are written below.
    pub target: PathBuf,
}

impl ProvenanceStore {
    /// Create a new store.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Path the copy of `file` would be written to.
    pub fn target_for(&self, file: &Path) -> Result<PathBuf, OpsError> {
        let relative = file
            .strip_prefix(&self.source)
            .map_err(|_| OpsError::OutsideSource {
                path: file.to_path_buf(),
                root: self.source.clone(),
            })?;
        Ok(self.target.join(relative))
    }

    /// Copy `file` into the store, creating parent folders as needed.
    ///
    /// The modification and access times of the source are kept. An
    /// existing copy is overwritten. Returns the path of the copy.
    pub fn mirror(&self, file: &Path) -> Result<PathBuf, OpsError> {
        let target = self.target_for(file)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| OpsError::io(parent, e))?;
        }

        let bytes = copy_file(file, &target)?;
        debug!("Copied {} -> {} ({bytes} bytes)", file.display(), target.display());

        Ok(target)
    }
}

/// Copy a single file, preserving its timestamps.
fn copy_file(source: &Path, dest: &Path) -> Result<u64, OpsError> {
    let metadata = fs::metadata(source).map_err(|e| OpsError::io(source, e))?;
    let bytes = fs::copy(source, dest).map_err(|e| OpsError::io(source, e))?;

    let mut times = FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    File::options()
        .write(true)
        .open(dest)
        .and_then(|f| f.set_times(times))
        .map_err(|e| OpsError::io(dest, e))?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_target_for() {
        let store = ProvenanceStore::new("/src", "/dst");
        assert_eq!(
            store.target_for(Path::new("/src/sub-01/x.vhdr")).unwrap(),
            PathBuf::from("/dst/sub-01/x.vhdr")
        );
    }

    #[test]
    fn test_target_for_outside_source() {
        let store = ProvenanceStore::new("/src", "/dst");
        let err = store.target_for(Path::new("/elsewhere/x.vhdr")).unwrap_err();
        assert!(matches!(err, OpsError::OutsideSource { .. }));
    }

    #[test]
    fn test_mirror_copies_and_creates_parents() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        let target = temp.path().join("dst");
        fs::create_dir_all(source.join("sub-01/ses-1")).unwrap();
        let file = source.join("sub-01/ses-1/x.vhdr");
        fs::write(&file, "Brain Vision Data Exchange Header File Version 1.0").unwrap();

        let store = ProvenanceStore::new(&source, &target);
        let copy = store.mirror(&file).unwrap();

        assert_eq!(copy, target.join("sub-01/ses-1/x.vhdr"));
        assert_eq!(fs::read_to_string(&copy).unwrap(), fs::read_to_string(&file).unwrap());
    }

    #[test]
    fn test_mirror_keeps_modification_time() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let file = source.join("x.edf");
        fs::write(&file, "edf").unwrap();

        let past = SystemTime::now() - Duration::from_secs(86_400);
        File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let copy = ProvenanceStore::new(&source, temp.path().join("dst"))
            .mirror(&file)
            .unwrap();
        let copied = fs::metadata(copy).unwrap().modified().unwrap();
        let delta = copied
            .duration_since(past)
            .unwrap_or_else(|e| e.duration());
        assert!(delta < Duration::from_secs(2));
    }

    #[test]
    fn test_mirror_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = ProvenanceStore::new(temp.path(), temp.path().join("dst"));
        let err = store.mirror(&temp.path().join("missing.vhdr")).unwrap_err();
        assert!(matches!(err, OpsError::Io { .. }));
    }
}

//! Attribute resolution for source files.
//!
//! The attributes of a file are the instrument-reported header values
//! overlaid with whatever the rule engine derives from the file path.
//! Rule-derived values win on collision.

use std::path::{Path, PathBuf};

use sova2coin_core::{FlatMap, KEY_SEPARATOR, MetaValue, PluginOptions};
use sova2coin_scan::EEG;
use tracing::debug;

use crate::host::AttributeSource;
use crate::recording::{Recording, SignalReader};
use crate::rules::{RuleEngine, RuleSet};
use crate::types::PluginResult;

/// Namespace of instrument-reported attributes.
pub const SIDECAR: &str = "sidecar";

pub const SAMPLING_FREQUENCY: &str = "sidecar.SamplingFrequency";
pub const POWER_LINE_FREQUENCY: &str = "sidecar.PowerLineFrequency";
pub const RECORDING_DURATION: &str = "sidecar.RecordingDuration";

/// Resolved attributes of a single source file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttributes {
    path: PathBuf,
    attributes: FlatMap,
}

impl FileAttributes {
    pub fn new(path: impl Into<PathBuf>, attributes: FlatMap) -> Self {
        Self {
            path: path.into(),
            attributes,
        }
    }

    /// The file these attributes were resolved for.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_inner(self) -> FlatMap {
        self.attributes
    }
}

impl AttributeSource for FileAttributes {
    /// Look up a dotted key. A bare name is looked up under `sidecar.`.
    fn attribute(&self, key: &str) -> MetaValue {
        if let Some(value) = self.attributes.get(key) {
            return value.clone();
        }
        if !key.contains(KEY_SEPARATOR) {
            return self.attributes.lookup(&format!("{SIDECAR}{KEY_SEPARATOR}{key}"));
        }
        MetaValue::NotApplicable
    }

    fn attributes(&self) -> &FlatMap {
        &self.attributes
    }
}

/// Header values of a recording as sidecar attributes.
pub fn instrument_attributes(recording: &dyn Recording) -> FlatMap {
    let mut attributes = FlatMap::new();
    attributes.insert(SAMPLING_FREQUENCY, recording.sampling_frequency());
    attributes.insert(POWER_LINE_FREQUENCY, recording.line_frequency());
    attributes.insert(RECORDING_DURATION, recording.duration());
    attributes
}

/// Computes attribute values from a signal reader and a rule engine.
#[derive(Clone, Copy)]
pub struct AttributeResolver<'a> {
    reader: &'a dyn SignalReader,
    rules: &'a dyn RuleEngine,
}

impl<'a> AttributeResolver<'a> {
    pub fn new(reader: &'a dyn SignalReader, rules: &'a dyn RuleEngine) -> Self {
        Self { reader, rules }
    }

    /// Resolve every attribute of `path`.
    ///
    /// Returns `None` for dataformats this plugin does not handle. With
    /// options, the configured rules are applied to the path and their
    /// flattened result is overlaid on the instrument values.
    pub fn file_attributes(
        &self,
        dataformat: &str,
        path: &Path,
        options: Option<&PluginOptions>,
    ) -> PluginResult<Option<FileAttributes>> {
        if dataformat != EEG {
            return Ok(None);
        }

        let recording = self.reader.open(path)?;
        let mut attributes = instrument_attributes(recording.as_ref());

        if let Some(options) = options {
            let rules = RuleSet::from_options(options)?;
            let derived = self.rules.apply(&rules, path)?.flatten();
            debug!(path = %path.display(), derived = derived.len(), "Applied path rules");
            attributes.overlay(derived);
        }

        Ok(Some(FileAttributes::new(path, attributes)))
    }

    /// Resolve a single attribute of `path`.
    ///
    /// Unknown keys resolve to `n/a`; `None` means the dataformat is not
    /// handled.
    pub fn resolve(
        &self,
        dataformat: &str,
        path: &Path,
        key: &str,
        options: Option<&PluginOptions>,
    ) -> PluginResult<Option<MetaValue>> {
        Ok(self
            .file_attributes(dataformat, path, options)?
            .map(|attributes| attributes.attribute(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingInfo;
    use crate::rules::PathPatternRules;
    use crate::types::PluginError;
    use sova2coin_core::MetaTree;

    struct FixedReader(RecordingInfo);

    impl SignalReader for FixedReader {
        fn open(&self, _path: &Path) -> PluginResult<Box<dyn Recording>> {
            Ok(Box::new(self.0))
        }
    }

    struct BrokenReader;

    impl SignalReader for BrokenReader {
        fn open(&self, path: &Path) -> PluginResult<Box<dyn Recording>> {
            Err(PluginError::read(path, "truncated header"))
        }
    }

    const FILE: &str = "/raw/sub-01/ses-1/sub-01.vhdr";

    fn reader() -> FixedReader {
        FixedReader(RecordingInfo::new(2500.0, None, 5001))
    }

    #[test]
    fn test_instrument_attributes() {
        let reader = reader();
        let resolver = AttributeResolver::new(&reader, &PathPatternRules);
        let file = Path::new(FILE);

        assert_eq!(
            resolver.resolve(EEG, file, SAMPLING_FREQUENCY, None).unwrap(),
            Some(MetaValue::Float(2500.0))
        );
        assert_eq!(
            resolver.resolve(EEG, file, POWER_LINE_FREQUENCY, None).unwrap(),
            Some(MetaValue::NotApplicable)
        );
        assert_eq!(
            resolver.resolve(EEG, file, RECORDING_DURATION, None).unwrap(),
            Some(MetaValue::Float(2.0))
        );
    }

    #[test]
    fn test_unknown_key_is_not_applicable() {
        let reader = reader();
        let resolver = AttributeResolver::new(&reader, &PathPatternRules);
        let value = resolver
            .resolve(EEG, Path::new(FILE), "entities.subject", None)
            .unwrap();
        assert_eq!(value, Some(MetaValue::NotApplicable));
    }

    #[test]
    fn test_unsupported_dataformat() {
        let resolver = AttributeResolver::new(&BrokenReader, &PathPatternRules);
        let value = resolver
            .resolve("DICOM", Path::new(FILE), SAMPLING_FREQUENCY, None)
            .unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_bare_key_falls_back_to_sidecar() {
        let reader = reader();
        let resolver = AttributeResolver::new(&reader, &PathPatternRules);
        let value = resolver
            .resolve(EEG, Path::new(FILE), "SamplingFrequency", None)
            .unwrap();
        assert_eq!(value, Some(MetaValue::Float(2500.0)));
    }

    #[test]
    fn test_rules_win_over_instrument() {
        let reader = reader();
        let resolver = AttributeResolver::new(&reader, &PathPatternRules);

        let mut options = PluginOptions::default();
        options.overrides = sova2coin_core::merge_all([
            MetaTree::from_dotted(POWER_LINE_FREQUENCY, 50).unwrap(),
            MetaTree::from_dotted(
                "non-bids.path_analysis.pattern",
                "sub-%entities.subject%/ses-%entities.session%/%ignore%",
            )
            .unwrap(),
        ]);

        let attributes = resolver
            .file_attributes(EEG, Path::new(FILE), Some(&options))
            .unwrap()
            .unwrap();
        assert_eq!(attributes.attribute(POWER_LINE_FREQUENCY), MetaValue::Integer(50));
        assert_eq!(attributes.attribute("entities.subject"), MetaValue::from("01"));
        assert_eq!(attributes.attribute("entities.session"), MetaValue::from("1"));
        assert_eq!(attributes.attribute(SAMPLING_FREQUENCY), MetaValue::Float(2500.0));
        assert!(!attributes.attributes().keys().any(|k| k.starts_with("non-bids")));
    }

    #[test]
    fn test_reader_error_propagates() {
        let resolver = AttributeResolver::new(&BrokenReader, &PathPatternRules);
        let result = resolver.resolve(EEG, Path::new(FILE), SAMPLING_FREQUENCY, None);
        assert!(matches!(result, Err(PluginError::ReadError { .. })));
    }
}

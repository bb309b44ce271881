//! The host's bidsmap: runs, datasources and plugin options.
//!
//! A bidsmap is the declarative plan mapping source runs onto BIDS
//! datatypes. It has an `Options` section and one section per dataformat:
//!
//! ```yaml
//! Options:
//!   plugins:
//!     sova2coin:
//!       rules_file: /rules/lemon.yml
//! EEG:
//!   subject: <<filepath:/sub-(.*?)/>>
//!   session: <<filepath:/sub-.*?/ses-(.*?)/>>
//!   eeg:
//!     - attributes:
//!         sidecar.SamplingFrequency: '2500.0'
//!         entities.subject: ''
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sova2coin_core::{FlatMap, MetaTree, MetaValue, PluginOptions};

use crate::types::{PluginError, PluginResult};

/// Datatype of runs that must be left out of the conversion.
pub const IGNORE_DATATYPE: &str = "exclude";

/// Datatype given to runs that matched nothing.
pub const UNKNOWN_DATATYPE: &str = "unknown";

const DEFAULT_SUBJECT_RULE: &str = "<<filepath:/sub-(.*?)/>>";
const DEFAULT_SESSION_RULE: &str = "<<filepath:/sub-.*?/ses-(.*?)/>>";
const SUBJECT_PREFIX: &str = "sub-";
const SESSION_PREFIX: &str = "ses-";

/// A complete bidsmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bidsmap {
    /// Host and plugin options.
    #[serde(rename = "Options", default)]
    pub options: BidsmapOptions,

    /// Run sections keyed by dataformat (e.g. `EEG`).
    #[serde(flatten)]
    pub dataformats: IndexMap<String, DataformatSection>,
}

/// The `Options` section of a bidsmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidsmapOptions {
    /// Options of the host itself, opaque to the plugin.
    #[serde(default, skip_serializing_if = "MetaTree::is_empty")]
    pub bidscoin: MetaTree,

    /// Options of each plugin, keyed by plugin name.
    #[serde(default)]
    pub plugins: IndexMap<String, MetaValue>,
}

/// Runs of one dataformat, grouped by datatype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataformatSection {
    /// Rule extracting the subject label.
    #[serde(default = "default_subject_rule")]
    pub subject: String,

    /// Rule extracting the session label.
    #[serde(default = "default_session_rule")]
    pub session: String,

    /// Runs keyed by datatype (e.g. `eeg`, `exclude`).
    #[serde(flatten)]
    pub datatypes: IndexMap<String, Vec<Run>>,
}

fn default_subject_rule() -> String {
    DEFAULT_SUBJECT_RULE.to_string()
}

fn default_session_rule() -> String {
    DEFAULT_SESSION_RULE.to_string()
}

impl Default for DataformatSection {
    fn default() -> Self {
        Self {
            subject: default_subject_rule(),
            session: default_session_rule(),
            datatypes: IndexMap::new(),
        }
    }
}

impl DataformatSection {
    /// Total number of runs over all datatypes.
    pub fn run_count(&self) -> usize {
        self.datatypes.values().map(Vec::len).sum()
    }
}

/// Position of a run inside a bidsmap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunIndex {
    /// Dataformat section.
    pub dataformat: String,
    /// Datatype list within the section.
    pub datatype: String,
    /// Index within the datatype list.
    pub index: usize,
}

/// One unit of source data and how it maps onto BIDS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Path of the file the run was discovered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<PathBuf>,

    /// Attribute values (or match patterns), keyed by dotted path.
    #[serde(default)]
    pub attributes: FlatMap,

    /// BIDS output labels.
    #[serde(default, skip_serializing_if = "MetaTree::is_empty")]
    pub bids: MetaTree,

    /// Extra sidecar metadata.
    #[serde(default, skip_serializing_if = "MetaTree::is_empty")]
    pub meta: MetaTree,

    /// Handle of the source this run was matched against.
    #[serde(skip)]
    pub datasource: DataSource,
}

impl Run {
    /// Create a run for a datasource with the given attributes.
    pub fn new(datasource: DataSource, attributes: FlatMap) -> Self {
        Self {
            provenance: Some(datasource.path.clone()),
            attributes,
            datasource,
            ..Self::default()
        }
    }
}

/// Handle on a single source file (or session folder while probing).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSource {
    /// File or folder path.
    pub path: PathBuf,
    /// Dataformat tag, empty if unknown.
    pub dataformat: String,
    /// Datatype assigned by run matching, empty before matching.
    pub datatype: String,
    /// Options of the plugin handling this source.
    pub options: Option<PluginOptions>,
}

impl DataSource {
    /// Create a datasource for `path`.
    pub fn new(path: impl Into<PathBuf>, options: Option<PluginOptions>, dataformat: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dataformat: dataformat.into(),
            datatype: String::new(),
            options,
        }
    }

    /// Check if this handle refers to an existing file of a known dataformat.
    pub fn is_datasource(&self) -> bool {
        !self.dataformat.is_empty() && self.path.is_file()
    }

    /// Extract the subject and session labels of this source.
    ///
    /// A rule of the form `<<filepath:REGEX>>` takes the first capture group
    /// of REGEX applied to the path (with `/` separators); any other rule is
    /// used as a literal label. Labels are cleaned to alphanumerics and
    /// prefixed with `sub-`/`ses-`. A label that cannot be extracted is
    /// returned empty.
    pub fn subid_sesid(&self, subject_rule: &str, session_rule: &str) -> PluginResult<(String, String)> {
        let subid = self.extract_label(subject_rule, SUBJECT_PREFIX)?;
        let sesid = self.extract_label(session_rule, SESSION_PREFIX)?;
        Ok((subid, sesid))
    }

    fn extract_label(&self, rule: &str, prefix: &str) -> PluginResult<String> {
        let raw = match rule
            .strip_prefix("<<filepath:")
            .and_then(|r| r.strip_suffix(">>"))
        {
            Some(pattern) => {
                let regex = Regex::new(pattern)
                    .map_err(|e| PluginError::config(format!("Invalid identifier rule '{rule}': {e}")))?;
                let path = self.path.to_string_lossy().replace('\\', "/");
                regex
                    .captures(&path)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            }
            None => rule.to_string(),
        };

        let label: String = raw
            .strip_prefix(prefix)
            .unwrap_or(&raw)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();

        Ok(if label.is_empty() {
            label
        } else {
            format!("{prefix}{label}")
        })
    }
}

impl Bidsmap {
    /// Load a bidsmap from a YAML file.
    pub fn load(path: &Path) -> PluginResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| PluginError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse a bidsmap from YAML text.
    pub fn from_yaml(content: &str) -> PluginResult<Self> {
        serde_yaml::from_str(content).map_err(|e| PluginError::Serialization(e.to_string()))
    }

    /// Write this bidsmap to a YAML file.
    pub fn save(&self, path: &Path) -> PluginResult<()> {
        let content = serde_yaml::to_string(self).map_err(|e| PluginError::Serialization(e.to_string()))?;
        fs::write(path, content).map_err(|e| PluginError::io(path, e))
    }

    /// Get the section of a dataformat.
    pub fn section(&self, dataformat: &str) -> Option<&DataformatSection> {
        self.dataformats.get(dataformat)
    }

    /// Check if the bidsmap holds any run for a dataformat.
    pub fn has_runs(&self, dataformat: &str) -> bool {
        self.section(dataformat).is_some_and(|s| s.run_count() > 0)
    }

    /// Get a run by its position.
    pub fn run(&self, index: &RunIndex) -> Option<&Run> {
        self.section(&index.dataformat)?
            .datatypes
            .get(&index.datatype)?
            .get(index.index)
    }

    /// Read the options of a plugin.
    ///
    /// Returns `None` if the plugin has no entry; an empty entry yields the
    /// default options.
    pub fn plugin_options(&self, name: &str) -> PluginResult<Option<PluginOptions>> {
        match self.options.plugins.get(name) {
            None => Ok(None),
            Some(MetaValue::NotApplicable) => Ok(Some(PluginOptions::default())),
            Some(MetaValue::Tree(tree)) => {
                let value = serde_json::to_value(tree).map_err(|e| PluginError::Serialization(e.to_string()))?;
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|e| PluginError::config(format!("Options of plugin '{name}': {e}")))
            }
            Some(other) => Err(PluginError::config(format!(
                "Options of plugin '{name}' must be a mapping, found '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const BIDSMAP: &str = r#"
Options:
  bidscoin:
    version: 3.7.0
  plugins:
    sova2coin:
      rules_file: /rules/lemon.yml
    other_plugin:
EEG:
  subject: <<filepath:/sub-(.*?)/>>
  session: <<filepath:/sub-.*?/ses-(.*?)/>>
  eeg:
    - provenance: /raw/sub-010003/ses-001/sub-010003.vhdr
      attributes:
        sidecar.SamplingFrequency: 2500.0
        entities.subject: '010003'
      bids:
        task: resting
  exclude: []
"#;

    #[test]
    fn test_parse_bidsmap() {
        let bidsmap = Bidsmap::from_yaml(BIDSMAP).unwrap();
        let section = bidsmap.section("EEG").unwrap();

        assert_eq!(section.run_count(), 1);
        assert_eq!(section.datatypes.keys().collect::<Vec<_>>(), vec!["eeg", "exclude"]);
        assert!(bidsmap.has_runs("EEG"));
        assert!(!bidsmap.has_runs("DICOM"));

        let run = bidsmap
            .run(&RunIndex {
                dataformat: "EEG".to_string(),
                datatype: "eeg".to_string(),
                index: 0,
            })
            .unwrap();
        assert_eq!(run.attributes.lookup("entities.subject"), MetaValue::from("010003"));
        assert_eq!(run.bids.get("task"), Some(&MetaValue::from("resting")));
    }

    #[test]
    fn test_plugin_options() {
        let bidsmap = Bidsmap::from_yaml(BIDSMAP).unwrap();

        let options = bidsmap.plugin_options("sova2coin").unwrap().unwrap();
        assert_eq!(options.rules_file, Some(PathBuf::from("/rules/lemon.yml")));

        let empty = bidsmap.plugin_options("other_plugin").unwrap().unwrap();
        assert_eq!(empty, PluginOptions::default());

        assert!(bidsmap.plugin_options("missing").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("bidsmap.yaml");

        let bidsmap = Bidsmap::from_yaml(BIDSMAP).unwrap();
        bidsmap.save(&path).unwrap();
        assert_eq!(Bidsmap::load(&path).unwrap(), bidsmap);
    }

    #[test]
    fn test_subid_sesid_from_path() {
        let source = DataSource::new("/raw/sub-010003/ses-001/sub-010003.vhdr", None, "EEG");
        let (subid, sesid) = source
            .subid_sesid(DEFAULT_SUBJECT_RULE, DEFAULT_SESSION_RULE)
            .unwrap();
        assert_eq!(subid, "sub-010003");
        assert_eq!(sesid, "ses-001");
    }

    #[test]
    fn test_subid_sesid_missing_session() {
        let source = DataSource::new("/raw/sub-01/sub-01.edf", None, "EEG");
        let (subid, sesid) = source
            .subid_sesid(DEFAULT_SUBJECT_RULE, DEFAULT_SESSION_RULE)
            .unwrap();
        assert_eq!(subid, "sub-01");
        assert_eq!(sesid, "");
    }

    #[test]
    fn test_subid_literal_rule_is_cleaned() {
        let source = DataSource::new("/raw/a.edf", None, "EEG");
        let (subid, sesid) = source.subid_sesid("sub-pilot_1", "").unwrap();
        assert_eq!(subid, "sub-pilot1");
        assert_eq!(sesid, "");
    }

    #[test]
    fn test_invalid_identifier_rule() {
        let source = DataSource::new("/raw/a.edf", None, "EEG");
        assert!(source.subid_sesid("<<filepath:(>>", "").is_err());
    }

    #[test]
    fn test_is_datasource() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("sub-01.vhdr");
        fs::write(&file, "header").unwrap();

        assert!(DataSource::new(&file, None, "EEG").is_datasource());
        assert!(!DataSource::new(&file, None, "").is_datasource());
        assert!(!DataSource::new(temp.path(), None, "EEG").is_datasource());
    }
}

//! Rule sets and the path-pattern rule engine.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sova2coin_core::{MetaTree, MetaValue, PluginOptions, merge_all};
use tracing::debug;

use crate::types::{PluginError, PluginResult};

/// Key of the subtree holding the engine's own directives.
pub const NON_BIDS_KEY: &str = "non-bids";

/// Placeholder of path segments that are matched but discarded.
pub const IGNORE_PLACEHOLDER: &str = "ignore";

const PATH_PATTERN_KEY: &str = "non-bids.path_analysis.pattern";

/// Rules describing how to derive metadata from a source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(MetaTree);

impl RuleSet {
    /// Wrap an existing tree.
    pub fn new(tree: MetaTree) -> Self {
        Self(tree)
    }

    /// Load rules from a YAML file. An empty file yields no rules.
    pub fn load(path: &Path) -> PluginResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| PluginError::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: MetaValue = serde_yaml::from_str(&content).map_err(|e| rules_error(path, e))?;
        match value {
            MetaValue::Tree(tree) => Ok(Self(tree)),
            MetaValue::NotApplicable => Ok(Self::default()),
            other => Err(rules_error(path, format!("expected a mapping, found '{other}'"))),
        }
    }

    /// Build the rules configured by the plugin options.
    ///
    /// Inline rules are merged over the content of the rules file.
    pub fn from_options(options: &PluginOptions) -> PluginResult<Self> {
        let file = match &options.rules_file {
            Some(path) => Self::load(path)?.0,
            None => MetaTree::new(),
        };
        Ok(Self(merge_all([file, options.overrides.clone()])))
    }

    /// The underlying tree.
    pub fn tree(&self) -> &MetaTree {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The configured path pattern, if any.
    pub fn path_pattern(&self) -> Option<&str> {
        self.0.get_path(PATH_PATTERN_KEY).and_then(MetaValue::as_str)
    }

    /// Rule content that applies to every file unchanged.
    pub fn static_metadata(&self) -> MetaTree {
        let mut tree = self.0.clone();
        tree.remove(NON_BIDS_KEY);
        tree
    }
}

fn rules_error(path: &Path, message: impl ToString) -> PluginError {
    PluginError::RulesError {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Derives a metadata tree from a source file path.
pub trait RuleEngine {
    fn apply(&self, rules: &RuleSet, path: &Path) -> PluginResult<MetaTree>;
}

/// Rule engine matching `%dotted.key%` placeholders against the file path.
///
/// The pattern is anchored at the end of the path and at a folder
/// boundary, so `sub-%entities.subject%/%ignore%.vhdr` matches
/// `/data/sub-01/sub-01.vhdr` and yields `entities.subject: "01"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPatternRules;

impl RuleEngine for PathPatternRules {
    fn apply(&self, rules: &RuleSet, path: &Path) -> PluginResult<MetaTree> {
        let mut metadata = rules.static_metadata();
        if let Some(pattern) = rules.path_pattern() {
            let from_path = parse_path(pattern, path)?;
            metadata = metadata.merge(&from_path);
        }
        Ok(metadata)
    }
}

/// Extract the placeholder values of `pattern` from `path`.
pub fn parse_path(pattern: &str, path: &Path) -> PluginResult<MetaTree> {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() % 2 == 0 {
        return Err(pattern_error(pattern, "unbalanced '%'"));
    }

    let mut keys = Vec::new();
    let mut regex = String::from("(?:^|/)");
    for (i, part) in parts.iter().enumerate() {
        if i % 2 == 0 {
            regex.push_str(&regex::escape(part));
        } else {
            if part.is_empty() {
                return Err(pattern_error(pattern, "empty placeholder"));
            }
            keys.push(*part);
            regex.push_str("([^/]+?)");
        }
    }
    regex.push('$');

    let regex = Regex::new(&regex).map_err(|e| pattern_error(pattern, e))?;
    let path_str = path.to_string_lossy().replace('\\', "/");

    let Some(captures) = regex.captures(&path_str) else {
        debug!(pattern, path = %path_str, "Path does not match the rule pattern");
        return Ok(MetaTree::new());
    };

    let mut chains = Vec::with_capacity(keys.len());
    for (key, capture) in keys.iter().zip(captures.iter().skip(1)) {
        if *key == IGNORE_PLACEHOLDER {
            continue;
        }
        if let Some(m) = capture {
            chains.push(MetaTree::from_dotted(key, m.as_str())?);
        }
    }
    Ok(merge_all(chains))
}

fn pattern_error(pattern: &str, message: impl ToString) -> PluginError {
    PluginError::RulesError {
        path: PathBuf::from(PATH_PATTERN_KEY),
        message: format!("{pattern}: {}", message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RULES: &str = "\
entities:
  task: resting
sidecar:
  PowerLineFrequency: 50
non-bids:
  path_analysis:
    pattern: sub-%entities.subject%/ses-%entities.session%/%ignore%.vhdr
";

    fn write_rules(content: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rules.yml");
        fs::write(&path, content).unwrap();
        (temp, path)
    }

    #[test]
    fn test_load_rules() {
        let (_temp, path) = write_rules(RULES);
        let rules = RuleSet::load(&path).unwrap();

        assert_eq!(
            rules.path_pattern(),
            Some("sub-%entities.subject%/ses-%entities.session%/%ignore%.vhdr")
        );
        let static_metadata = rules.static_metadata();
        assert!(!static_metadata.contains_key(NON_BIDS_KEY));
        assert_eq!(static_metadata.get_path("entities.task"), Some(&MetaValue::from("resting")));
    }

    #[test]
    fn test_load_empty_rules() {
        let (_temp, path) = write_rules("");
        assert!(RuleSet::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_invalid_rules() {
        let (_temp, path) = write_rules("- just\n- a list\n");
        assert!(matches!(RuleSet::load(&path), Err(PluginError::RulesError { .. })));

        let (_temp, path) = write_rules("key: [unclosed\n");
        assert!(matches!(RuleSet::load(&path), Err(PluginError::RulesError { .. })));
    }

    #[test]
    fn test_inline_rules_win() {
        let (_temp, path) = write_rules(RULES);
        let mut options = PluginOptions::with_rules_file(&path);
        options
            .overrides
            .insert("sidecar", MetaTree::from_dotted("PowerLineFrequency", 60).unwrap());

        let rules = RuleSet::from_options(&options).unwrap();
        assert_eq!(
            rules.tree().get_path("sidecar.PowerLineFrequency"),
            Some(&MetaValue::Integer(60))
        );
        assert!(rules.path_pattern().is_some());
    }

    #[test]
    fn test_apply_path_pattern() {
        let (_temp, path) = write_rules(RULES);
        let rules = RuleSet::load(&path).unwrap();

        let tree = PathPatternRules
            .apply(&rules, Path::new("/raw/sub-01/ses-1/sub-01.vhdr"))
            .unwrap();
        let flat = tree.flatten();

        assert_eq!(flat.lookup("entities.subject"), MetaValue::from("01"));
        assert_eq!(flat.lookup("entities.session"), MetaValue::from("1"));
        assert_eq!(flat.lookup("entities.task"), MetaValue::from("resting"));
        assert!(!flat.contains_key("ignore"));
    }

    #[test]
    fn test_unmatched_path_keeps_static_rules() {
        let (_temp, path) = write_rules(RULES);
        let rules = RuleSet::load(&path).unwrap();

        let tree = PathPatternRules
            .apply(&rules, Path::new("/raw/pilot/recording.edf"))
            .unwrap();
        assert!(tree.get_path("entities.subject").is_none());
        assert_eq!(tree.get_path("entities.task"), Some(&MetaValue::from("resting")));
    }

    #[test]
    fn test_pattern_matches_at_folder_boundary() {
        let tree = parse_path("sub-%entities.subject%/%ignore%", Path::new("/data/xsub-01/a.edf")).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_unbalanced_pattern() {
        let result = parse_path("sub-%entities.subject/x", Path::new("/sub-01/x"));
        assert!(matches!(result, Err(PluginError::RulesError { .. })));
    }
}

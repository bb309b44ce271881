//! Plugin option types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::tree::MetaTree;

/// Name under which the plugin is registered in the bidsmap options.
pub const PLUGIN_NAME: &str = "sova2coin";

/// Options read from `Options.plugins.sova2coin` of a bidsmap.
///
/// Any key other than the named fields is kept in `overrides` and merged
/// on top of the rules loaded from `rules_file`.
#[derive(Debug, Clone, Default, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), default, build_fn(validate = "Self::validate"))]
pub struct PluginOptions {
    /// YAML rules file describing how to derive metadata from file paths.
    #[builder(setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,

    /// Supported extensions (with leading dot), replacing the default registry.
    #[builder(setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,

    /// Inline rules, applied over the rules file.
    #[serde(flatten)]
    pub overrides: MetaTree,
}

impl PluginOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(ref file)) = self.rules_file {
            if file.as_os_str().is_empty() {
                return Err("Rules file path cannot be empty".to_string());
            }
        }
        if let Some(Some(ref extensions)) = self.extensions {
            if let Some(bad) = extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
                return Err(format!("Extension '{bad}' must start with a dot"));
            }
        }
        Ok(())
    }
}

impl PluginOptions {
    /// Create a new options builder.
    pub fn builder() -> PluginOptionsBuilder {
        PluginOptionsBuilder::default()
    }

    /// Create options that only point at a rules file.
    pub fn with_rules_file(rules_file: impl Into<PathBuf>) -> Self {
        Self {
            rules_file: Some(rules_file.into()),
            ..Self::default()
        }
    }

    /// Check if any path rules are configured.
    pub fn has_rules(&self) -> bool {
        self.rules_file.is_some() || !self.overrides.is_empty()
    }
}

//! The EEG plugin and its collaborators.

use std::path::Path;

use sova2coin_core::{MetaValue, PLUGIN_NAME, PluginOptions};
use sova2coin_scan::{EegClassifier, SourceClassifier, SourceWalker, WalkReport};

use crate::bidsmap::Bidsmap;
use crate::host::Host;
use crate::recording::{BidsWriter, SignalReader};
use crate::resolver::AttributeResolver;
use crate::rules::{PathPatternRules, RuleEngine};
use crate::types::PluginResult;

/// How a session folder is enumerated for source files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Enumeration {
    /// Every source file at any depth.
    #[default]
    Recursive,
    /// Only the first source file of each immediate subfolder.
    FirstPerFolder,
}

/// The EEG plugin: classification, attribute resolution, and the
/// mapping and conversion callbacks.
pub struct EegPlugin {
    pub(crate) host: Box<dyn Host>,
    pub(crate) reader: Box<dyn SignalReader>,
    pub(crate) writer: Box<dyn BidsWriter>,
    pub(crate) rules: Box<dyn RuleEngine>,
    pub(crate) classifier: EegClassifier,
    pub(crate) walker: SourceWalker,
    pub(crate) enumeration: Enumeration,
}

impl EegPlugin {
    /// Create a plugin with the default classifier, walker and rule engine.
    pub fn new(
        host: impl Host + 'static,
        reader: impl SignalReader + 'static,
        writer: impl BidsWriter + 'static,
    ) -> Self {
        Self {
            host: Box::new(host),
            reader: Box::new(reader),
            writer: Box::new(writer),
            rules: Box::new(PathPatternRules),
            classifier: EegClassifier::new(),
            walker: SourceWalker::new(),
            enumeration: Enumeration::default(),
        }
    }

    /// Replace the rule engine.
    pub fn with_rule_engine(mut self, rules: impl RuleEngine + 'static) -> Self {
        self.rules = Box::new(rules);
        self
    }

    /// Replace the classifier used when the options name no extensions.
    pub fn with_classifier(mut self, classifier: EegClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the session walker.
    pub fn with_walker(mut self, walker: SourceWalker) -> Self {
        self.walker = walker;
        self
    }

    /// Choose how sessions are enumerated.
    pub fn with_enumeration(mut self, enumeration: Enumeration) -> Self {
        self.enumeration = enumeration;
        self
    }

    /// Dataformat of `path`, or `""` if it is not a supported source file.
    pub fn is_sourcefile(&self, path: &Path) -> &'static str {
        self.classifier.classify(path)
    }

    /// Value of attribute `key` of a source file.
    ///
    /// Returns `None` for dataformats other than EEG and `n/a` for keys
    /// that resolve to nothing.
    pub fn get_attribute(
        &self,
        dataformat: &str,
        path: &Path,
        key: &str,
        options: Option<&PluginOptions>,
    ) -> PluginResult<Option<MetaValue>> {
        self.resolver().resolve(dataformat, path, key, options)
    }

    pub(crate) fn resolver(&self) -> AttributeResolver<'_> {
        AttributeResolver::new(self.reader.as_ref(), self.rules.as_ref())
    }

    /// Options of this plugin from the first bidsmap that has them.
    pub(crate) fn options_from(&self, bidsmaps: &[&Bidsmap]) -> PluginResult<Option<PluginOptions>> {
        for bidsmap in bidsmaps {
            if let Some(options) = bidsmap.plugin_options(PLUGIN_NAME)? {
                return Ok(Some(options));
            }
        }
        Ok(None)
    }

    pub(crate) fn classifier_for(&self, options: Option<&PluginOptions>) -> EegClassifier {
        match options {
            Some(options) if options.extensions.is_some() => EegClassifier::from_options(options),
            _ => self.classifier.clone(),
        }
    }

    pub(crate) fn source_files(
        &self,
        session: &Path,
        classifier: &EegClassifier,
        dataformat: &str,
    ) -> PluginResult<WalkReport> {
        let report = match self.enumeration {
            Enumeration::Recursive => self.walker.walk(session, classifier, dataformat)?,
            Enumeration::FirstPerFolder => self.walker.first_per_folder(session, classifier, dataformat)?,
        };
        Ok(report)
    }
}

impl std::fmt::Debug for EegPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EegPlugin")
            .field("classifier", &self.classifier)
            .field("walker", &self.walker)
            .field("enumeration", &self.enumeration)
            .finish_non_exhaustive()
    }
}

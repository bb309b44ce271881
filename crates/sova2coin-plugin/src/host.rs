//! The host contract and a reference host.

use std::path::Path;

use regex::Regex;
use sova2coin_core::{FlatMap, MetaValue, PluginOptions};
use sova2coin_scan::{SourceClassifier, SourceWalker};
use tracing::debug;

use crate::bidsmap::{Bidsmap, DataSource, IGNORE_DATATYPE, Run, RunIndex, UNKNOWN_DATATYPE};
use crate::types::PluginResult;

/// Resolved attribute values of one source file.
pub trait AttributeSource {
    /// Value of a dotted attribute key, `n/a` if unknown.
    fn attribute(&self, key: &str) -> MetaValue;

    /// Every resolved attribute.
    fn attributes(&self) -> &FlatMap;
}

impl AttributeSource for FlatMap {
    fn attribute(&self, key: &str) -> MetaValue {
        self.lookup(key)
    }

    fn attributes(&self) -> &FlatMap {
        self
    }
}

/// Primitives the curation host provides to the plugin.
pub trait Host {
    /// Probe a session for its dataformat.
    ///
    /// Returns a datasource with an empty dataformat if the session holds
    /// no recognizable source data.
    fn get_datasource(
        &self,
        session: &Path,
        options: Option<&PluginOptions>,
        classifier: &dyn SourceClassifier,
    ) -> PluginResult<DataSource>;

    /// Find the run of `bidsmap` matching a datasource.
    ///
    /// Without a match, the returned run has datatype
    /// [`UNKNOWN_DATATYPE`] and the index is `None`.
    fn get_matching_run(
        &self,
        datasource: &DataSource,
        attributes: &dyn AttributeSource,
        bidsmap: &Bidsmap,
    ) -> PluginResult<(Run, Option<RunIndex>)>;

    /// Check if `bidsmap` already holds `run` under `datatype` (empty = any).
    fn exist_run(&self, bidsmap: &Bidsmap, datatype: &str, run: &Run) -> bool;

    /// Add `run` to `bidsmap` under its datatype.
    fn append_run(&self, bidsmap: &mut Bidsmap, run: Run);
}

/// Self-contained [`Host`] implementation.
///
/// Template attributes are regular expressions that must match the whole
/// resolved value; empty patterns match anything, but a run needs at least
/// one non-empty pattern to match at all.
#[derive(Debug, Clone, Default)]
pub struct BasicHost {
    walker: SourceWalker,
}

impl BasicHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host probing sessions with a custom walker.
    pub fn with_walker(walker: SourceWalker) -> Self {
        Self { walker }
    }
}

impl Host for BasicHost {
    fn get_datasource(
        &self,
        session: &Path,
        options: Option<&PluginOptions>,
        classifier: &dyn SourceClassifier,
    ) -> PluginResult<DataSource> {
        let found = if session.is_file() {
            Some((session.to_path_buf(), classifier.classify(session)))
        } else {
            self.walker.probe(session, classifier)?
        };

        Ok(match found {
            Some((path, dataformat)) => DataSource::new(path, options.cloned(), dataformat),
            None => DataSource::new(session, options.cloned(), ""),
        })
    }

    fn get_matching_run(
        &self,
        datasource: &DataSource,
        attributes: &dyn AttributeSource,
        bidsmap: &Bidsmap,
    ) -> PluginResult<(Run, Option<RunIndex>)> {
        if let Some(section) = bidsmap.section(&datasource.dataformat) {
            let ignored = section
                .datatypes
                .iter()
                .filter(|(datatype, _)| *datatype == IGNORE_DATATYPE);
            let others = section
                .datatypes
                .iter()
                .filter(|(datatype, _)| *datatype != IGNORE_DATATYPE);

            for (datatype, runs) in ignored.chain(others) {
                for (index, template) in runs.iter().enumerate() {
                    if !RunPatterns::compile(template).matches(attributes) {
                        continue;
                    }
                    debug!(
                        path = %datasource.path.display(),
                        datatype = %datatype,
                        index,
                        "Matched run"
                    );

                    let mut run = template.clone();
                    run.attributes = template
                        .attributes
                        .keys()
                        .map(|key| (key.to_string(), attributes.attribute(key)))
                        .collect();
                    run.provenance = Some(datasource.path.clone());
                    run.datasource = DataSource {
                        datatype: datatype.clone(),
                        ..datasource.clone()
                    };

                    let index = RunIndex {
                        dataformat: datasource.dataformat.clone(),
                        datatype: datatype.clone(),
                        index,
                    };
                    return Ok((run, Some(index)));
                }
            }
        }

        let source = DataSource {
            datatype: UNKNOWN_DATATYPE.to_string(),
            ..datasource.clone()
        };
        Ok((Run::new(source, attributes.attributes().clone()), None))
    }

    fn exist_run(&self, bidsmap: &Bidsmap, datatype: &str, run: &Run) -> bool {
        let Some(section) = bidsmap.section(&run.datasource.dataformat) else {
            return false;
        };
        section
            .datatypes
            .iter()
            .filter(|(name, _)| datatype.is_empty() || *name == datatype)
            .flat_map(|(_, runs)| runs)
            .any(|existing| existing.attributes == run.attributes)
    }

    fn append_run(&self, bidsmap: &mut Bidsmap, run: Run) {
        let datatype = if run.datasource.datatype.is_empty() {
            UNKNOWN_DATATYPE.to_string()
        } else {
            run.datasource.datatype.clone()
        };
        bidsmap
            .dataformats
            .entry(run.datasource.dataformat.clone())
            .or_default()
            .datatypes
            .entry(datatype)
            .or_default()
            .push(run);
    }
}

/// A template attribute prepared for matching.
enum Pattern<'a> {
    /// A list pattern; any alternative may match.
    Any(Vec<Pattern<'a>>),
    Value {
        raw: &'a MetaValue,
        number: Option<f64>,
        regex: Option<Regex>,
    },
}

impl<'a> Pattern<'a> {
    fn compile(raw: &'a MetaValue) -> Self {
        match raw {
            MetaValue::List(items) => Self::Any(items.iter().map(Pattern::compile).collect()),
            _ => Self::Value {
                raw,
                number: raw
                    .as_f64()
                    .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok())),
                regex: raw
                    .as_str()
                    .and_then(|s| Regex::new(&format!("^(?:{s})$")).ok()),
            },
        }
    }

    fn matches(&self, value: &MetaValue) -> bool {
        let (raw, number, regex) = match self {
            Self::Any(items) => return items.iter().any(|item| item.matches(value)),
            Self::Value { raw, number, regex } => (*raw, *number, regex),
        };
        if raw == value {
            return true;
        }
        // Only resolved numbers compare numerically; "01" is not 1.
        if let (Some(a), Some(b)) = (number, value.as_f64()) {
            return a == b;
        }

        let text = value.to_string();
        match regex {
            Some(re) => re.is_match(&text),
            None => raw.to_string() == text,
        }
    }
}

/// The constrained attributes of a template run, compiled.
struct RunPatterns<'a> {
    patterns: Vec<(&'a str, Pattern<'a>)>,
}

impl<'a> RunPatterns<'a> {
    fn compile(template: &'a Run) -> Self {
        let patterns = template
            .attributes
            .iter()
            .filter(|(_, pattern)| !is_wildcard(pattern))
            .map(|(key, pattern)| (key.as_str(), Pattern::compile(pattern)))
            .collect();
        Self { patterns }
    }

    /// A run without a single constrained attribute never matches.
    fn matches(&self, attributes: &dyn AttributeSource) -> bool {
        !self.patterns.is_empty()
            && self
                .patterns
                .iter()
                .all(|(key, pattern)| pattern.matches(&attributes.attribute(key)))
    }
}

fn is_wildcard(pattern: &MetaValue) -> bool {
    match pattern {
        MetaValue::NotApplicable => true,
        MetaValue::String(s) => s.is_empty(),
        MetaValue::List(items) => items.is_empty(),
        _ => false,
    }
}

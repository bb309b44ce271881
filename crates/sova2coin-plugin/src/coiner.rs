//! Conversion phase: write the runs of a session to the BIDS dataset.

use std::path::{Path, PathBuf};

use sova2coin_core::{MetaTree, MetaValue};
use sova2coin_scan::EEG;
use tracing::{debug, error, info, info_span};

use crate::bidsmap::{Bidsmap, DataSource, DataformatSection, IGNORE_DATATYPE};
use crate::plugin::EegPlugin;
use crate::recording::WriteRequest;
use crate::types::PluginResult;

const ENTITIES_KEY: &str = "entities";

/// Outcome of converting one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    /// Subject label, e.g. `sub-01`.
    pub subject: String,
    /// Session label, empty if the dataset has no sessions.
    pub session: String,
    /// Output files written by the writer.
    pub converted: Vec<PathBuf>,
    /// Source files matched to the ignore datatype.
    pub skipped: Vec<PathBuf>,
    /// Source files without a run in the bidsmap.
    pub unmatched: Vec<PathBuf>,
}

impl EegPlugin {
    /// Convert every source file of `session` according to `bidsmap`.
    ///
    /// Files matching no run are logged and left out; the bidsmap needs to
    /// be rebuilt for them. Reader and writer failures abort the session.
    pub fn bidscoiner(&self, session: &Path, bidsmap: &Bidsmap, bids_root: &Path) -> PluginResult<ConversionReport> {
        let span = info_span!("bidscoiner", session = %session.display());
        let _enter = span.enter();

        let mut report = ConversionReport::default();

        let options = self.options_from(&[bidsmap])?;
        let classifier = self.classifier_for(options.as_ref());

        let probe = self.host.get_datasource(session, options.as_ref(), &classifier)?;
        let dataformat = probe.dataformat.clone();
        if dataformat.is_empty() {
            info!("No {EEG} source data found in: {}", session.display());
            return Ok(report);
        }
        if dataformat != EEG {
            info!("Unsupported dataformat '{dataformat}' in: {}", session.display());
            return Ok(report);
        }

        let default_section = DataformatSection::default();
        let section = bidsmap.section(&dataformat).unwrap_or(&default_section);
        let (subid, sesid) = probe.subid_sesid(&section.subject, &section.session)?;
        if subid.is_empty() {
            error!("No valid subject identifier found for: {}", session.display());
            return Ok(report);
        }
        report.subject = subid.clone();
        report.session = sesid.clone();

        let walk = self.source_files(session, &classifier, &dataformat)?;

        for file in walk.files {
            let datasource = DataSource::new(&file, options.clone(), dataformat.as_str());
            if !datasource.is_datasource() {
                debug!("Not a datasource: {}", file.display());
                continue;
            }

            let Some(attributes) = self
                .resolver()
                .file_attributes(&dataformat, &file, options.as_ref())?
            else {
                continue;
            };

            let (run, index) = self.host.get_matching_run(&datasource, &attributes, bidsmap)?;
            if index.is_none() {
                error!(
                    "Skipping unknown '{}' run: {}\n-> Re-run the bidsmapper and delete {} to solve this",
                    run.datasource.datatype,
                    file.display(),
                    bids_root.display()
                );
                report.unmatched.push(file);
                continue;
            }
            if run.datasource.datatype == IGNORE_DATATYPE {
                info!("Leaving out: {}", file.display());
                report.skipped.push(file);
                continue;
            }

            let recording = self.reader.open(&file)?;
            let metadata = run.attributes.unflatten()?;
            let mut entities = metadata.subtree(ENTITIES_KEY).cloned().unwrap_or_default();
            fill_entity(&mut entities, "subject", &subid, "sub-");
            fill_entity(&mut entities, "session", &sesid, "ses-");

            let request = WriteRequest {
                source: &file,
                entities: &entities,
                metadata: &metadata,
                bids_root,
                overwrite: true,
            };
            let output = self.writer.write(recording.as_ref(), &request)?;
            info!("Converted {} -> {}", file.display(), output.display());
            report.converted.push(output);
        }

        Ok(report)
    }
}

/// Set an entity from its session-level label unless the run provides it.
fn fill_entity(entities: &mut MetaTree, key: &str, label: &str, prefix: &str) {
    let label = label.strip_prefix(prefix).unwrap_or(label);
    if label.is_empty() {
        return;
    }
    let missing = entities
        .get(key)
        .is_none_or(|value| value.is_not_applicable() || value.as_str().is_some_and(str::is_empty));
    if missing {
        entities.insert(key, MetaValue::from(label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_missing_entities() {
        let mut entities = MetaTree::new();
        entities.insert("task", "resting");
        entities.insert("session", MetaValue::NotApplicable);

        fill_entity(&mut entities, "subject", "sub-01", "sub-");
        fill_entity(&mut entities, "session", "ses-1", "ses-");

        assert_eq!(entities.get("subject"), Some(&MetaValue::from("01")));
        assert_eq!(entities.get("session"), Some(&MetaValue::from("1")));
        assert_eq!(entities.keys().collect::<Vec<_>>(), vec!["task", "session", "subject"]);
    }

    #[test]
    fn test_run_entities_are_kept() {
        let mut entities = MetaTree::new();
        entities.insert("subject", "010003");

        fill_entity(&mut entities, "subject", "sub-01", "sub-");
        fill_entity(&mut entities, "session", "", "ses-");

        assert_eq!(entities.get("subject"), Some(&MetaValue::from("010003")));
        assert!(!entities.contains_key("session"));
    }
}

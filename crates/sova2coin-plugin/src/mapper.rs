//! Mapping phase: discover the runs of a session.

use std::path::{Path, PathBuf};

use sova2coin_ops::ProvenanceStore;
use sova2coin_scan::EEG;
use tracing::{debug, error, info, info_span};

use crate::bidsmap::{Bidsmap, DataSource};
use crate::plugin::EegPlugin;
use crate::types::PluginResult;

/// Outcome of mapping one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingReport {
    /// Dataformat of the session, empty if none was found.
    pub dataformat: String,
    /// Source files considered.
    pub files: Vec<PathBuf>,
    /// Provenance of every run added to the new bidsmap.
    pub added: Vec<PathBuf>,
    /// Hidden entries that were skipped.
    pub hidden: usize,
}

impl MappingReport {
    /// Number of runs added to the new bidsmap.
    pub fn runs_added(&self) -> usize {
        self.added.len()
    }
}

impl EegPlugin {
    /// Add the runs of `session` that `bidsmap_new` does not know yet.
    ///
    /// Every source file is matched against `bidsmap_old` first and
    /// `template` second. Runs are only added through the host. With a
    /// provenance store, each added file is copied into the store and the
    /// run points at the copy.
    pub fn bidsmapper(
        &self,
        session: &Path,
        bidsmap_old: &Bidsmap,
        bidsmap_new: &mut Bidsmap,
        template: &Bidsmap,
        store: Option<&ProvenanceStore>,
    ) -> PluginResult<MappingReport> {
        let span = info_span!("bidsmapper", session = %session.display());
        let _enter = span.enter();

        let options = self.options_from(&[&*bidsmap_new, template])?;
        let classifier = self.classifier_for(options.as_ref());

        let probe = self.host.get_datasource(session, options.as_ref(), &classifier)?;
        let dataformat = probe.dataformat;
        let mut report = MappingReport {
            dataformat: dataformat.clone(),
            ..MappingReport::default()
        };

        if dataformat.is_empty() {
            debug!("No source data found");
            return Ok(report);
        }
        if dataformat != EEG {
            error!("Unsupported dataformat '{dataformat}' in {}", session.display());
            return Ok(report);
        }

        let walk = self.source_files(session, &classifier, &dataformat)?;
        report.hidden = walk.hidden_count();

        if !bidsmap_old.has_runs(&dataformat) && !template.has_runs(&dataformat) {
            error!(
                "No {dataformat} runs found in the bidsmap or template, cannot map {}",
                session.display()
            );
            return Ok(report);
        }

        for file in walk.files {
            report.files.push(file.clone());

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

            let (mut run, index) = self.host.get_matching_run(&datasource, &attributes, bidsmap_old)?;
            if index.is_none() {
                (run, _) = self.host.get_matching_run(&datasource, &attributes, template)?;
            }

            if self.host.exist_run(bidsmap_new, "", &run) {
                continue;
            }

            info!(
                "Discovered '{}' {dataformat} sample: {}",
                run.datasource.datatype,
                file.display()
            );

            if let Some(store) = store {
                let copy = store.mirror(&file)?;
                run.provenance = Some(copy.clone());
                run.datasource.path = copy;
            }

            report
                .added
                .push(run.provenance.clone().unwrap_or_else(|| file.clone()));
            self.host.append_run(bidsmap_new, run);
        }

        Ok(report)
    }
}

//! EEG mapping and conversion callbacks for BIDS curation hosts.
//!
//! This crate provides the plugin a curation host calls into at the two
//! phases of its pipeline: mapping, which builds a bidsmap from the source
//! sessions, and conversion, which executes the finished bidsmap.
//!
//! # Architecture
//!
//! The plugin never parses signal files or writes BIDS output itself.
//! Those jobs, and the host's run bookkeeping, sit behind traits:
//!
//! - [`Host`]: datasource probing, run matching and appending
//!   ([`BasicHost`] is a self-contained implementation)
//! - [`SignalReader`] / [`Recording`]: opening recordings
//! - [`BidsWriter`]: writing a recording into the dataset
//! - [`RuleEngine`]: deriving metadata from a file path
//!   ([`PathPatternRules`] by default)
//!
//! # Example
//!
//! ```ignore
//! use sova2coin_plugin::{BasicHost, Bidsmap, EegPlugin};
//!
//! let plugin = EegPlugin::new(BasicHost::new(), reader, writer);
//! let template = Bidsmap::load(Path::new("template.yaml"))?;
//! let mut bidsmap = Bidsmap::default();
//!
//! plugin.bidsmapper(session, &Bidsmap::default(), &mut bidsmap, &template, None)?;
//! plugin.bidscoiner(session, &bidsmap, bids_root)?;
//! ```

mod bidsmap;
mod coiner;
mod host;
mod mapper;
mod plugin;
mod recording;
mod resolver;
mod rules;
mod types;

pub use bidsmap::{
    Bidsmap, BidsmapOptions, DataSource, DataformatSection, IGNORE_DATATYPE, Run, RunIndex,
    UNKNOWN_DATATYPE,
};
pub use coiner::ConversionReport;
pub use host::{AttributeSource, BasicHost, Host};
pub use mapper::MappingReport;
pub use plugin::{EegPlugin, Enumeration};
pub use recording::{BidsWriter, Recording, RecordingInfo, SignalReader, WriteRequest};
pub use resolver::{
    AttributeResolver, FileAttributes, POWER_LINE_FREQUENCY, RECORDING_DURATION, SAMPLING_FREQUENCY,
    SIDECAR, instrument_attributes,
};
pub use rules::{IGNORE_PLACEHOLDER, NON_BIDS_KEY, PathPatternRules, RuleEngine, RuleSet, parse_path};
pub use types::{PluginError, PluginResult};

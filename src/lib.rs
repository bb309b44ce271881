//! sova2coin - EEG mapping and conversion plugin for BIDS curation hosts.
//!
//! Re-exports the public API of the workspace crates:
//!
//! - [`sova2coin_core`]: metadata trees addressed by dotted keys, plugin options
//! - [`sova2coin_scan`]: source file classification and session walking
//! - [`sova2coin_ops`]: the provenance store
//! - [`sova2coin_plugin`]: the host contract and the mapping/conversion callbacks
//!
//! Hosts call [`init_logging`] once at startup to see the plugin's log
//! output.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use sova2coin_core;
pub use sova2coin_ops;
pub use sova2coin_plugin;
pub use sova2coin_scan;

pub use sova2coin_core::{FlatMap, MetaTree, MetaValue, PLUGIN_NAME, PluginOptions, merge, merge_all, unflatten};
pub use sova2coin_ops::ProvenanceStore;
pub use sova2coin_plugin::{
    BasicHost, BidsWriter, Bidsmap, ConversionReport, DataSource, EegPlugin, Host, MappingReport, PluginError,
    PluginResult, Recording, Run, SignalReader, WriteRequest,
};
pub use sova2coin_scan::{EEG, EegClassifier, SourceClassifier, SourceWalker};

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive` (e.g. `"sova2coin=info"`).
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_logging(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("Logging initialized");
    }
    installed
}

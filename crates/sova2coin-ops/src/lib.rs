//! File operations for sova2coin.
//!
//! The only operation the plugin performs on source data itself is
//! mirroring newly discovered files into a provenance store, so the
//! bidsmap can point at a stable copy.

mod error;
mod provenance;

pub use error::OpsError;
pub use provenance::ProvenanceStore;

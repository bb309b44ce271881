//! Core types for sova2coin.
//!
//! This crate provides the metadata data structures shared by the other
//! sova2coin crates: hierarchical metadata trees addressed by dotted keys,
//! the flat attribute maps they flatten into, and the plugin options.

mod config;
mod error;
mod flat;
mod tree;
mod value;

pub use config::{PLUGIN_NAME, PluginOptions, PluginOptionsBuilder};
pub use error::CoreError;
pub use flat::FlatMap;
pub use tree::{KEY_SEPARATOR, MetaTree, merge, merge_all, unflatten};
pub use value::{MetaValue, NOT_APPLICABLE};

//! Parsing and validation of `ictx.toml` transaction configuration.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`IctxConfig`]: which transaction variant to open, where its stash lives,
//! whether cache storages are buffered in memory, and the report level.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, load_config_or_default, CONFIG_FILE};
pub use types::*;

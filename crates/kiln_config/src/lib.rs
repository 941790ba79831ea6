//! Parsing and validation of `kiln.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`KilnConfig`] describing the source root, cache location, worker settings
//! and the resource-type extension table.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE, MAX_EXTENSION_LEN};
pub use types::*;

//! Configuration for conversion runs
//!
//! Provides types and parsing for `tilebank.toml`.

pub mod loader;
pub mod schema;

pub use loader::{
    find_config, load_config, merge_cli_overrides, CliOverrides, ConfigError, CONFIG_FILE,
};
pub use schema::*;

//! Configuration loading and discovery for `tilebank.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::TilebankConfig;
use crate::merge::ColourDepth;
use crate::registry::SentinelReuse;
use crate::splitter::SentinelMode;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file searched for
pub const CONFIG_FILE: &str = "tilebank.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse tilebank.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override tile width
    pub tile_width: Option<u32>,
    /// Override tile height
    pub tile_height: Option<u32>,
    /// Override colour depth
    pub colour_depth: Option<ColourDepth>,
    /// Override sentinel placement
    pub sentinels: Option<SentinelMode>,
    /// Override sentinel reuse rule
    pub sentinel_reuse: Option<SentinelReuse>,
}

/// Find tilebank.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find tilebank.toml by walking up from a specific directory.
///
/// This is the internal implementation that allows specifying the start directory,
/// useful for testing.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a tilebank.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(Some(Path::new("assets/tilebank.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<TilebankConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            log::debug!("Loading config from {}", p.display());
            load_config_file(&p)
        }
        None => Ok(TilebankConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<TilebankConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: TilebankConfig = toml::from_str(&contents)?;
    validated(config)
}

fn validated(config: TilebankConfig) -> Result<TilebankConfig, ConfigError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(config)
}

/// Merge CLI overrides into a configuration and re-validate it.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(
    mut config: TilebankConfig,
    overrides: &CliOverrides,
) -> Result<TilebankConfig, ConfigError> {
    if let Some(width) = overrides.tile_width {
        config.tiles.width = width;
    }
    if let Some(height) = overrides.tile_height {
        config.tiles.height = height;
    }
    if let Some(depth) = overrides.colour_depth {
        config.tiles.colour_depth = depth;
    }
    if let Some(sentinels) = overrides.sentinels {
        config.scan.sentinels = sentinels;
    }
    if let Some(reuse) = overrides.sentinel_reuse {
        config.scan.sentinel_reuse = reuse;
    }

    validated(config)
}

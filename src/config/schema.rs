//! Configuration schema types for `tilebank.toml`
//!
//! Defines the structure and validation rules for a conversion run.

use serde::{Deserialize, Serialize};

use crate::merge::{ColourDepth, MergeOptions};
use crate::registry::{DuplicatePolicy, SentinelReuse, TransparencyPolicy};
use crate::splitter::{ScanOrder, SentinelMode, SplitOptions};

/// Tile geometry and registry policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesConfig {
    /// Tile width in pixels
    #[serde(default = "default_tile_size")]
    pub width: u32,
    /// Tile height in pixels
    #[serde(default = "default_tile_size")]
    pub height: u32,
    /// Target character colour depth
    #[serde(default)]
    pub colour_depth: ColourDepth,
    /// Handling of fully transparent tiles
    #[serde(default)]
    pub transparency: TransparencyPolicy,
    /// Handling of repeated tiles
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            width: default_tile_size(),
            height: default_tile_size(),
            colour_depth: ColourDepth::default(),
            transparency: TransparencyPolicy::default(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

fn default_tile_size() -> u32 {
    8
}

/// Scan order and sentinel placement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub order: ScanOrder,
    #[serde(default)]
    pub sentinels: SentinelMode,
    #[serde(default)]
    pub sentinel_reuse: SentinelReuse,
}

/// Palette merge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Keep slot 0 of every 4bpp bank for the transparent colour
    #[serde(default = "default_true")]
    pub reserve_transparent: bool,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            reserve_transparent: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Complete `tilebank.toml` configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilebankConfig {
    #[serde(default)]
    pub tiles: TilesConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "tiles.width")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tilebank.toml: '{}' {}", self.field, self.message)
    }
}

impl TilebankConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.tiles.width == 0 {
            errors.push(ConfigValidationError {
                field: "tiles.width".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        if self.tiles.height == 0 {
            errors.push(ConfigValidationError {
                field: "tiles.height".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }

    /// Splitter parameters described by this configuration.
    pub fn split_options(&self) -> SplitOptions {
        SplitOptions {
            tile_width: self.tiles.width,
            tile_height: self.tiles.height,
            transparency: self.tiles.transparency,
            duplicates: self.tiles.duplicates,
            order: self.scan.order,
            sentinels: self.scan.sentinels,
            sentinel_reuse: self.scan.sentinel_reuse,
        }
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            reserve_transparent: self.palette.reserve_transparent,
        }
    }
}

//! Palette merging
//!
//! Turns the local palettes of every registered tile into one hardware
//! palette and rewrites each tile's colour grid to match. The strategy is
//! chosen by [`ColourDepth`]:
//!
//! - [`ColourDepth::Eight`]: every tile indexes one shared palette directly.
//! - [`ColourDepth::Four`]: tiles are packed into 16-colour banks and index
//!   their own bank.
//!
//! A registry can only be merged once; merging rewrites tile grids in place.

mod banked;
mod flat;

use image::Rgba;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::PaletteEntry;
use crate::grid::{GridError, RemapObserver};
use crate::registry::TileRegistry;

pub use banked::{Bank, BANK_CAPACITY, MAX_BANKS};
pub use flat::FLAT_PALETTE_CAPACITY;

/// Colour depth of the target character mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColourDepth {
    /// 8 bits per pixel, one global palette
    #[serde(rename = "8bpp")]
    Eight,
    /// 4 bits per pixel, 16-colour banks
    #[default]
    #[serde(rename = "4bpp")]
    Four,
}

impl ColourDepth {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(ColourDepth::Eight),
            4 => Some(ColourDepth::Four),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            ColourDepth::Eight => 8,
            ColourDepth::Four => 4,
        }
    }
}

impl std::fmt::Display for ColourDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bpp", self.bits())
    }
}

/// Options shared by both merge strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Reserve slot 0 of every 4bpp bank for the transparent colour
    pub reserve_transparent: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            reserve_transparent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("tile {tile} needs {required} colours, a bank holds {capacity}")]
    TooManyColoursInTile {
        tile: usize,
        required: usize,
        capacity: usize,
    },
    #[error("{required} palette banks required, hardware allows {allowed}")]
    TooManyBanks { required: usize, allowed: usize },
    #[error("bank {bank} was filled with {colours} colours, a bank holds {capacity}")]
    BankOverflow {
        bank: usize,
        colours: usize,
        capacity: usize,
    },
    #[error("same-bank group {group} overlaps tiles already placed in different banks")]
    ConflictingGroup { group: usize },
    #[error("tile registry has already been merged")]
    AlreadyMerged,
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// The final palette plus, for 4bpp, the banks it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedPalette {
    pub depth: ColourDepth,
    pub entries: Vec<PaletteEntry>,
    /// Banks in creation order; empty for 8bpp
    pub banks: Vec<Bank>,
}

impl MergedPalette {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries referenced by at least one tile.
    pub fn used_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_used).count()
    }

    pub fn colours(&self) -> impl Iterator<Item = Rgba<u8>> + '_ {
        self.entries.iter().map(|e| e.colour)
    }
}

/// Merge all tile palettes in `registry` for the given colour depth.
///
/// # Errors
///
/// - [`MergeError::AlreadyMerged`] if the registry was merged before.
/// - [`MergeError::TooManyColoursInTile`], [`MergeError::TooManyBanks`],
///   [`MergeError::BankOverflow`] and [`MergeError::ConflictingGroup`] when
///   the tiles cannot be packed into 4bpp banks.
///
/// Failed 4bpp merges leave every tile untouched.
///
/// Same-bank groups that do not fit an existing bank are still committed to
/// a fresh bank as a whole, exactly as the packing heuristic prescribes. When
/// that commit leaves the bank with more than [`BANK_CAPACITY`] colours the
/// merge fails with [`MergeError::BankOverflow`]. Earlier tools built on the
/// same heuristic emitted such an overfull bank as-is, so inputs that relied
/// on that produce an error here instead of a palette.
pub fn merge(
    registry: &mut TileRegistry,
    depth: ColourDepth,
    options: &MergeOptions,
) -> Result<MergedPalette, MergeError> {
    if registry.is_merged() {
        return Err(MergeError::AlreadyMerged);
    }

    match depth {
        ColourDepth::Eight => flat::merge(registry),
        ColourDepth::Four => banked::merge(registry, options),
    }
}

/// Logs every rewritten cell of one tile at trace level.
struct RemapTrace {
    tile: usize,
}

impl RemapObserver for RemapTrace {
    fn row(&mut self, y: usize) {
        log::trace!("Tile {} row {}", self.tile, y);
    }

    fn cell(&mut self, x: usize, y: usize, old: usize, new: usize) {
        if old != new {
            log::trace!("Tile {} ({}, {}): {} -> {}", self.tile, x, y, old, new);
        }
    }
}

/// Apply a colour index map to a tile grid, tracing changes when enabled.
fn remap_tile(
    registry: &mut TileRegistry,
    tile: usize,
    map: &[usize],
) -> Result<(), GridError> {
    let grid = registry.tiles_mut()[tile].grid_mut();
    if log::log_enabled!(log::Level::Trace) {
        grid.remap_with(map, &mut RemapTrace { tile })
    } else {
        grid.remap(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DuplicatePolicy, TransparencyPolicy};
    use crate::tile::Tile;
    use image::RgbaImage;

    #[test]
    fn test_colour_depth_bits() {
        assert_eq!(ColourDepth::from_bits(4), Some(ColourDepth::Four));
        assert_eq!(ColourDepth::from_bits(8), Some(ColourDepth::Eight));
        assert_eq!(ColourDepth::from_bits(2), None);
        assert_eq!(ColourDepth::Four.to_string(), "4bpp");
    }

    #[test]
    fn test_colour_depth_serde_names() {
        let depth: ColourDepth = serde_json::from_str("\"8bpp\"").unwrap();
        assert_eq!(depth, ColourDepth::Eight);
        assert_eq!(serde_json::to_string(&ColourDepth::Four).unwrap(), "\"4bpp\"");
    }

    #[test]
    fn test_merge_twice_fails() {
        let mut registry = TileRegistry::new();
        registry.add(
            Tile::from_image(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]))),
            TransparencyPolicy::OpaqueOnly,
            DuplicatePolicy::UniqueOnly,
        );

        merge(&mut registry, ColourDepth::Eight, &MergeOptions::default()).unwrap();
        let err = merge(&mut registry, ColourDepth::Four, &MergeOptions::default()).unwrap_err();
        assert_eq!(err, MergeError::AlreadyMerged);
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = TileRegistry::new();
        let palette = merge(&mut registry, ColourDepth::Four, &MergeOptions::default()).unwrap();
        assert!(palette.is_empty());
        assert!(palette.banks.is_empty());
    }
}

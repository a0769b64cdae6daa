//! 8bpp merge: one global palette shared by every tile.

use image::Rgba;

use crate::color::{canonical, PaletteEntry};
use crate::registry::TileRegistry;

use super::{remap_tile, ColourDepth, MergeError, MergedPalette};

/// Entries an 8bpp palette can address
pub const FLAT_PALETTE_CAPACITY: usize = 256;

pub(super) fn merge(registry: &mut TileRegistry) -> Result<MergedPalette, MergeError> {
    let mut palette: Vec<Rgba<u8>> = Vec::new();
    let mut maps: Vec<Vec<usize>> = Vec::with_capacity(registry.len());

    for tile in registry.tiles() {
        let map = tile
            .colours()
            .iter()
            .map(|&colour| {
                let colour = canonical(colour);
                match palette.iter().position(|c| *c == colour) {
                    Some(i) => i,
                    None => {
                        palette.push(colour);
                        palette.len() - 1
                    }
                }
            })
            .collect();
        maps.push(map);
    }

    registry.mark_merged();
    for (tile, map) in maps.iter().enumerate() {
        remap_tile(registry, tile, map)?;
    }

    if palette.len() > FLAT_PALETTE_CAPACITY {
        log::warn!(
            "8bpp palette has {} colours, only {} are addressable",
            palette.len(),
            FLAT_PALETTE_CAPACITY
        );
    }
    log::debug!(
        "Merged {} tile palette(s) into {} colour(s)",
        registry.len(),
        palette.len()
    );

    Ok(MergedPalette {
        depth: ColourDepth::Eight,
        entries: palette.into_iter().map(PaletteEntry::used).collect(),
        banks: Vec::new(),
    })
}

//! tilebank - Tile deduplication and palette bank allocation
//!
//! This library provides functionality to:
//! - Split an image into fixed-size character tiles, removing duplicates
//!   and fully transparent tiles
//! - Keep each tile as a small palette plus an indexed pixel grid
//! - Merge tile palettes into one 8bpp palette or into 16-colour 4bpp banks
//! - Constrain groups of tiles to share one 4bpp bank

pub mod cli;
pub mod color;
pub mod config;
pub mod grid;
pub mod merge;
pub mod registry;
pub mod splitter;
pub mod tile;

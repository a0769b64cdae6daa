//! Tile splitter - slices a raster into character tiles
//!
//! Each complete tile of the source image is turned into a [`Tile`] and
//! offered to a [`TileRegistry`]. The result is a grid of registry indices
//! describing which tile occupies each cell, optionally framed by transparent
//! sentinel tiles at the start and end of every scan group.

use clap::ValueEnum;
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::IndexedGrid;
use crate::registry::{DuplicatePolicy, Insertion, SentinelReuse, TileRegistry, TransparencyPolicy};
use crate::tile::Tile;

/// Order in which tiles are visited. The scan group is a row for
/// `RowMajor` and a column for `ColumnMajor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScanOrder {
    #[default]
    RowMajor,
    ColumnMajor,
}

/// Where transparent sentinel tiles are placed around each scan group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SentinelMode {
    #[default]
    None,
    Before,
    After,
    BeforeAndAfter,
}

impl SentinelMode {
    pub fn before(self) -> bool {
        matches!(self, SentinelMode::Before | SentinelMode::BeforeAndAfter)
    }

    pub fn after(self) -> bool {
        matches!(self, SentinelMode::After | SentinelMode::BeforeAndAfter)
    }
}

/// Parameters for a single split call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    pub tile_width: u32,
    pub tile_height: u32,
    pub transparency: TransparencyPolicy,
    pub duplicates: DuplicatePolicy,
    pub order: ScanOrder,
    pub sentinels: SentinelMode,
    /// Reuse rule for sentinels requested by this call. Vertical scrolling
    /// needs distinct lead and trail tiles, which means `AlwaysCreateNew`.
    pub sentinel_reuse: SentinelReuse,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            tile_width: 8,
            tile_height: 8,
            transparency: TransparencyPolicy::default(),
            duplicates: DuplicatePolicy::default(),
            order: ScanOrder::default(),
            sentinels: SentinelMode::default(),
            sentinel_reuse: SentinelReuse::default(),
        }
    }
}

/// Counters describing what a split did with each tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitStats {
    /// Complete image tiles visited
    pub scanned: usize,
    /// Image tiles appended to the registry
    pub added: usize,
    /// Image tiles replaced by the canonical transparent tile
    pub reused_transparent: usize,
    /// Image tiles replaced by an identical earlier tile
    pub reused_duplicate: usize,
    /// Sentinel positions filled
    pub sentinels: usize,
    /// Sentinel tiles appended to the registry
    pub sentinels_added: usize,
}

impl SplitStats {
    fn record(&mut self, insertion: Insertion) {
        self.scanned += 1;
        match insertion {
            Insertion::Added(_) => self.added += 1,
            Insertion::ReusedTransparent(_) => self.reused_transparent += 1,
            Insertion::ReusedDuplicate(_) => self.reused_duplicate += 1,
        }
    }

    fn record_sentinel(&mut self, insertion: Insertion) {
        self.sentinels += 1;
        if insertion.was_added() {
            self.sentinels_added += 1;
        }
    }
}

/// Result of splitting one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    /// Registry index of the tile occupying each cell, sentinels included
    pub grid: IndexedGrid,
    pub stats: SplitStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("invalid tile size {width}x{height}, both dimensions must be positive")]
    InvalidTileSize { width: u32, height: u32 },
}

/// Split `image` into tiles and register them in `registry`.
///
/// Partial tiles at the right and bottom edges are dropped. When sentinels
/// are enabled, lead sentinels form the first column (row-major) or first
/// row (column-major) of the returned grid and trail sentinels the last.
///
/// # Errors
///
/// Returns [`SplitError::InvalidTileSize`] if either tile dimension is zero.
pub fn split_image(
    image: &RgbaImage,
    registry: &mut TileRegistry,
    options: &SplitOptions,
) -> Result<SplitResult, SplitError> {
    let (tw, th) = (options.tile_width, options.tile_height);
    if tw == 0 || th == 0 {
        return Err(SplitError::InvalidTileSize {
            width: tw,
            height: th,
        });
    }

    let columns = image.width() / tw;
    let rows = image.height() / th;
    let mut splitter = Splitter {
        image,
        registry,
        options,
        stats: SplitStats::default(),
    };

    let grid = if columns == 0 || rows == 0 {
        IndexedGrid::new()
    } else {
        match options.order {
            ScanOrder::RowMajor => splitter.row_major(columns, rows),
            ScanOrder::ColumnMajor => splitter.column_major(columns, rows),
        }
    };

    let stats = splitter.stats;
    log::debug!(
        "Split {}x{} image into {}x{} tiles: {} scanned, {} added, \
         {} transparent reused, {} duplicates reused, {} sentinel(s)",
        image.width(),
        image.height(),
        tw,
        th,
        stats.scanned,
        stats.added,
        stats.reused_transparent,
        stats.reused_duplicate,
        stats.sentinels
    );

    Ok(SplitResult { grid, stats })
}

struct Splitter<'a> {
    image: &'a RgbaImage,
    registry: &'a mut TileRegistry,
    options: &'a SplitOptions,
    stats: SplitStats,
}

impl Splitter<'_> {
    fn row_major(&mut self, columns: u32, rows: u32) -> IndexedGrid {
        let mut grid = IndexedGrid::new();
        let mut leads = Vec::new();
        let mut trails = Vec::new();

        for ty in 0..rows {
            grid.add_row();
            if self.options.sentinels.before() {
                leads.push(self.sentinel());
            }
            for tx in 0..columns {
                grid.add_column(self.tile_at(tx, ty));
            }
            if self.options.sentinels.after() {
                trails.push(self.sentinel());
            }
        }

        if self.options.sentinels.before() {
            grid.insert_column(0, &leads);
        }
        if self.options.sentinels.after() {
            grid.insert_column(grid.width(), &trails);
        }
        grid
    }

    fn column_major(&mut self, columns: u32, rows: u32) -> IndexedGrid {
        let mut grid = IndexedGrid::prefill(columns as usize, rows as usize, 0);
        let mut leads = Vec::new();
        let mut trails = Vec::new();

        for tx in 0..columns {
            if self.options.sentinels.before() {
                leads.push(self.sentinel());
            }
            for ty in 0..rows {
                let index = self.tile_at(tx, ty);
                grid.set(tx as usize, ty as usize, index);
            }
            if self.options.sentinels.after() {
                trails.push(self.sentinel());
            }
        }

        if self.options.sentinels.before() {
            grid.insert_row(0, &leads);
        }
        if self.options.sentinels.after() {
            grid.insert_row(grid.height(), &trails);
        }
        grid
    }

    fn tile_at(&mut self, tx: u32, ty: u32) -> usize {
        let (tw, th) = (self.options.tile_width, self.options.tile_height);
        let pixels = imageops::crop_imm(self.image, tx * tw, ty * th, tw, th).to_image();
        let insertion = self.registry.add(
            Tile::from_image(pixels),
            self.options.transparency,
            self.options.duplicates,
        );
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Tile ({}, {}) -> {:?}", tx, ty, insertion);
        }
        self.stats.record(insertion);
        insertion.index()
    }

    fn sentinel(&mut self) -> usize {
        let insertion = self.registry.add_transparent_image(
            self.options.tile_width,
            self.options.tile_height,
            self.options.sentinel_reuse,
        );
        self.stats.record_sentinel(insertion);
        insertion.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    /// Build an image from a grid of solid 8x8 tile colours
    fn tiled(colours: &[&[Rgba<u8>]]) -> RgbaImage {
        let rows = colours.len() as u32;
        let columns = colours[0].len() as u32;
        RgbaImage::from_fn(columns * 8, rows * 8, |x, y| {
            colours[(y / 8) as usize][(x / 8) as usize]
        })
    }

    #[test]
    fn test_two_distinct_tiles() {
        let mut registry = TileRegistry::new();
        let image = tiled(&[&[RED, GREEN]]);
        let result = split_image(&image, &mut registry, &SplitOptions::default()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(result.grid.rows(), &[vec![0, 1]]);
        assert_eq!(result.stats.scanned, 2);
        assert_eq!(result.stats.added, 2);
    }

    #[test]
    fn test_partial_tiles_are_dropped() {
        let mut registry = TileRegistry::new();
        let image = RgbaImage::from_pixel(20, 12, RED);
        let result = split_image(&image, &mut registry, &SplitOptions::default()).unwrap();

        assert_eq!(result.grid.width(), 2);
        assert_eq!(result.grid.height(), 1);
        assert_eq!(result.stats.scanned, 2);
    }

    #[test]
    fn test_image_smaller_than_tile() {
        let mut registry = TileRegistry::new();
        let image = RgbaImage::from_pixel(4, 4, RED);
        let options = SplitOptions {
            sentinels: SentinelMode::BeforeAndAfter,
            ..Default::default()
        };
        let result = split_image(&image, &mut registry, &options).unwrap();

        assert!(result.grid.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zero_tile_size() {
        let mut registry = TileRegistry::new();
        let image = RgbaImage::from_pixel(8, 8, RED);
        let options = SplitOptions {
            tile_width: 0,
            ..Default::default()
        };
        let err = split_image(&image, &mut registry, &options).unwrap_err();
        assert_eq!(err, SplitError::InvalidTileSize { width: 0, height: 8 });
    }

    #[test]
    fn test_duplicates_and_transparency_are_counted() {
        let mut registry = TileRegistry::new();
        let image = tiled(&[&[CLEAR, RED, RED, CLEAR]]);
        let result = split_image(&image, &mut registry, &SplitOptions::default()).unwrap();

        assert_eq!(result.grid.rows(), &[vec![0, 1, 1, 0]]);
        assert_eq!(result.stats.added, 2);
        assert_eq!(result.stats.reused_duplicate, 1);
        assert_eq!(result.stats.reused_transparent, 1);
    }

    #[test]
    fn test_keep_all_policies() {
        let mut registry = TileRegistry::new();
        let image = tiled(&[&[CLEAR, RED, RED, CLEAR]]);
        let options = SplitOptions {
            transparency: TransparencyPolicy::KeepAll,
            duplicates: DuplicatePolicy::KeepAll,
            ..Default::default()
        };
        let result = split_image(&image, &mut registry, &options).unwrap();

        assert_eq!(result.grid.rows(), &[vec![0, 1, 2, 3]]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_column_major_order() {
        let mut registry = TileRegistry::new();
        let image = tiled(&[&[RED, GREEN], &[GREEN, RED]]);
        let options = SplitOptions {
            order: ScanOrder::ColumnMajor,
            duplicates: DuplicatePolicy::KeepAll,
            ..Default::default()
        };
        let result = split_image(&image, &mut registry, &options).unwrap();

        // Column 0 is visited first: (0,0)=0, (0,1)=1, then (1,0)=2, (1,1)=3
        assert_eq!(result.grid.rows(), &[vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_row_major_sentinels_always_new() {
        let mut registry = TileRegistry::new();
        let image = tiled(&[&[RED], &[GREEN]]);
        let options = SplitOptions {
            sentinels: SentinelMode::BeforeAndAfter,
            sentinel_reuse: SentinelReuse::AlwaysCreateNew,
            ..Default::default()
        };
        let result = split_image(&image, &mut registry, &options).unwrap();

        // Row 0: lead 0, red 1, trail 2. Row 1: lead 3, green 4, trail 5.
        assert_eq!(result.grid.rows(), &[vec![0, 1, 2], vec![3, 4, 5]]);
        assert_eq!(result.stats.sentinels, 4);
        assert_eq!(result.stats.sentinels_added, 4);
        assert_eq!(registry.canonical_transparent(), Some(0));
    }

    #[test]
    fn test_row_major_sentinels_reuse_canonical() {
        let mut registry = TileRegistry::new();
        let image = tiled(&[&[RED], &[GREEN]]);
        let options = SplitOptions {
            sentinels: SentinelMode::After,
            ..Default::default()
        };
        let result = split_image(&image, &mut registry, &options).unwrap();

        assert_eq!(result.grid.rows(), &[vec![0, 1], vec![2, 1]]);
        assert_eq!(result.stats.sentinels_added, 1);
    }

    #[test]
    fn test_sentinels_reuse_if_immediately_previous() {
        let mut registry = TileRegistry::new();
        let image = tiled(&[&[RED], &[GREEN]]);
        let options = SplitOptions {
            sentinels: SentinelMode::BeforeAndAfter,
            sentinel_reuse: SentinelReuse::ReuseIfImmediatelyPrevious,
            ..Default::default()
        };
        let result = split_image(&image, &mut registry, &options).unwrap();

        // Row 1's lead reuses row 0's trail, which is the last tile registered
        assert_eq!(result.grid.rows(), &[vec![0, 1, 2], vec![2, 3, 4]]);
    }

    #[test]
    fn test_column_major_sentinels() {
        let mut registry = TileRegistry::new();
        let image = tiled(&[&[RED, GREEN]]);
        let options = SplitOptions {
            order: ScanOrder::ColumnMajor,
            sentinels: SentinelMode::Before,
            sentinel_reuse: SentinelReuse::AlwaysCreateNew,
            ..Default::default()
        };
        let result = split_image(&image, &mut registry, &options).unwrap();

        assert_eq!(result.grid.rows(), &[vec![0, 2], vec![1, 3]]);
    }
}

//! Convert command: split an image into tiles and merge their palettes

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

use crate::config::{load_config, merge_cli_overrides, ConfigError, TilebankConfig};
use crate::merge::{merge, MergeError, MergedPalette};
use crate::registry::TileRegistry;
use crate::splitter::{split_image, SplitError, SplitStats};

use super::{Cli, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

#[derive(Debug, Error)]
pub(crate) enum ConvertError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to open '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Split failed: {0}")]
    Split(#[from] SplitError),
    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),
}

impl ConvertError {
    fn exit_code(&self) -> u8 {
        match self {
            ConvertError::Config(ConfigError::Validation(_)) => EXIT_INVALID_ARGS,
            _ => EXIT_ERROR,
        }
    }
}

/// One registered tile as it appears in the report.
#[derive(Debug, Serialize)]
struct TileReport {
    index: usize,
    bank: usize,
    transparent: bool,
    /// Palette index of every pixel, bank offset applied
    pixels: Vec<Vec<usize>>,
}

/// Everything a conversion produced.
#[derive(Debug, Serialize)]
pub(crate) struct Report {
    input: PathBuf,
    tile_width: u32,
    tile_height: u32,
    split: SplitStats,
    /// Tile index per cell of the source image
    map: Vec<Vec<usize>>,
    tiles: Vec<TileReport>,
    palette: MergedPalette,
}

/// Run a full conversion and build its report.
pub(crate) fn convert(input: &Path, config: &TilebankConfig) -> Result<Report, ConvertError> {
    let image = image::open(input)
        .map_err(|source| ConvertError::Image {
            path: input.to_path_buf(),
            source,
        })?
        .to_rgba8();

    let mut registry = TileRegistry::new();
    let split = split_image(&image, &mut registry, &config.split_options())?;
    let palette = merge(
        &mut registry,
        config.tiles.colour_depth,
        &config.merge_options(),
    )?;
    log::info!(
        "{} tile(s), {} palette entries ({} used)",
        registry.len(),
        palette.len(),
        palette.used_count()
    );

    let tiles = registry
        .tiles()
        .iter()
        .map(|tile| TileReport {
            index: tile.index(),
            bank: tile.bank(),
            transparent: tile.is_fully_transparent(),
            pixels: tile
                .grid()
                .rows()
                .iter()
                .map(|row| row.iter().map(|&v| tile.global_colour_index(v)).collect())
                .collect(),
        })
        .collect();

    Ok(Report {
        input: input.to_path_buf(),
        tile_width: config.tiles.width,
        tile_height: config.tiles.height,
        split: split.stats,
        map: split.grid.rows().to_vec(),
        tiles,
        palette,
    })
}

fn print_summary(report: &Report) {
    let map_height = report.map.len();
    let map_width = report.map.first().map_or(0, Vec::len);

    println!("{}", report.input.display());
    println!(
        "  map:     {}x{} cells of {}x{} pixels",
        map_width, map_height, report.tile_width, report.tile_height
    );
    println!(
        "  tiles:   {} ({} scanned, {} transparent reused, {} duplicates reused)",
        report.tiles.len(),
        report.split.scanned,
        report.split.reused_transparent,
        report.split.reused_duplicate
    );
    if report.split.sentinels > 0 {
        println!(
            "  sentinels: {} ({} new)",
            report.split.sentinels, report.split.sentinels_added
        );
    }
    println!(
        "  palette: {} {} entries ({} used)",
        report.palette.depth,
        report.palette.len(),
        report.palette.used_count()
    );
    for bank in &report.palette.banks {
        println!(
            "    bank {:>2}: {:>2} colours, {} tile(s)",
            bank.index(),
            bank.len(),
            bank.members().len()
        );
    }
}

/// Execute the convert command
pub(crate) fn run_convert(cli: &Cli) -> ExitCode {
    let result = load_config(cli.config.as_deref())
        .and_then(|config| merge_cli_overrides(config, &cli.overrides()))
        .map_err(ConvertError::from)
        .and_then(|config| convert(&cli.input, &config));

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: Failed to serialize report: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        print_summary(&report);
    }

    ExitCode::from(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ColourDepth;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, image: &RgbaImage) -> PathBuf {
        let path = dir.path().join(name);
        image.save(&path).unwrap();
        path
    }

    fn two_tile_image() -> RgbaImage {
        // Left tile red, right tile fully transparent
        RgbaImage::from_fn(16, 8, |x, _| {
            if x < 8 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_convert_banked() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "level.png", &two_tile_image());

        let report = convert(&path, &TilebankConfig::default()).unwrap();

        assert_eq!(report.map, vec![vec![0, 1]]);
        assert_eq!(report.tiles.len(), 2);
        assert!(report.tiles[1].transparent);
        assert_eq!(report.palette.depth, ColourDepth::Four);
        assert_eq!(report.palette.len(), 16);
        assert_eq!(report.palette.banks.len(), 1);
    }

    #[test]
    fn test_convert_flat() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "level.png", &two_tile_image());
        let mut config = TilebankConfig::default();
        config.tiles.colour_depth = ColourDepth::Eight;

        let report = convert(&path, &config).unwrap();

        assert!(report.palette.banks.is_empty());
        assert_eq!(report.palette.len(), 2);
        assert!(report.tiles.iter().all(|t| t.bank == 0));
    }

    #[test]
    fn test_convert_missing_image() {
        let dir = TempDir::new().unwrap();
        let err = convert(&dir.path().join("missing.png"), &TilebankConfig::default()).unwrap_err();

        assert!(matches!(err, ConvertError::Image { .. }));
        assert_eq!(err.exit_code(), EXIT_ERROR);
    }

    #[test]
    fn test_report_serializes() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "level.png", &two_tile_image());
        let report = convert(&path, &TilebankConfig::default()).unwrap();

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["split"]["scanned"], 2);
        assert_eq!(json["palette"]["depth"], "4bpp");
        assert_eq!(json["palette"]["entries"][0]["colour"], "#00000000");
    }
}

//! Command-line interface implementation
//!
//! The CLI is a thin shell over the library: it loads configuration, decodes
//! the source image, runs the split and merge passes and reports the outcome.

mod convert;
mod logger;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::CliOverrides;
use crate::merge::ColourDepth;
use crate::registry::SentinelReuse;
use crate::splitter::SentinelMode;

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// tilebank - Deduplicate character tiles and allocate palette banks
#[derive(Parser)]
#[command(name = "tilebank")]
#[command(about = "Deduplicate character tiles of an image and allocate hardware palette banks")]
#[command(version)]
pub struct Cli {
    /// Source image (PNG)
    pub input: PathBuf,

    /// Configuration file. Defaults to the nearest tilebank.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Character colour depth in bits per pixel (4 or 8)
    #[arg(long, value_parser = parse_depth)]
    pub depth: Option<ColourDepth>,

    /// Tile size (e.g., "8x8", "16x8")
    #[arg(long, value_parser = parse_size)]
    pub tile: Option<(u32, u32)>,

    /// Transparent sentinel placement around each scan group
    #[arg(long, value_enum)]
    pub sentinels: Option<SentinelMode>,

    /// How sentinel tiles are reused
    #[arg(long, value_enum)]
    pub sentinel_reuse: Option<SentinelReuse>,

    /// Print a JSON report instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            tile_width: self.tile.map(|(w, _)| w),
            tile_height: self.tile.map(|(_, h)| h),
            colour_depth: self.depth,
            sentinels: self.sentinels,
            sentinel_reuse: self.sentinel_reuse,
        }
    }
}

/// Parse a "WxH" size string into (width, height).
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid size '{}', expected WxH (e.g., \"8x8\")", s));
    }
    let w: u32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", parts[0].trim()))?;
    let h: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", parts[1].trim()))?;
    if w == 0 || h == 0 {
        return Err(format!("size dimensions must be > 0, got {}x{}", w, h));
    }
    Ok((w, h))
}

fn parse_depth(s: &str) -> Result<ColourDepth, String> {
    let bits: u8 = s
        .trim()
        .trim_end_matches("bpp")
        .parse()
        .map_err(|_| format!("invalid colour depth '{}'", s))?;
    ColourDepth::from_bits(bits)
        .ok_or_else(|| format!("unsupported colour depth {}, expected 4 or 8", bits))
}

/// Entry point for the `tilebank` binary.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);
    convert::run_convert(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_size_valid() {
        assert_eq!(parse_size("8x8"), Ok((8, 8)));
        assert_eq!(parse_size("16x8"), Ok((16, 8)));
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(parse_size("8").is_err());
        assert!(parse_size("8x").is_err());
        assert!(parse_size("0x8").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn test_parse_depth() {
        assert_eq!(parse_depth("4"), Ok(ColourDepth::Four));
        assert_eq!(parse_depth("8bpp"), Ok(ColourDepth::Eight));
        assert!(parse_depth("2").is_err());
        assert!(parse_depth("many").is_err());
    }

    #[test]
    fn test_overrides_from_args() {
        let cli = Cli::parse_from([
            "tilebank",
            "level.png",
            "--depth",
            "8",
            "--tile",
            "16x8",
            "--sentinels",
            "before-and-after",
            "--sentinel-reuse",
            "always-create-new",
        ]);
        let overrides = cli.overrides();

        assert_eq!(overrides.tile_width, Some(16));
        assert_eq!(overrides.tile_height, Some(8));
        assert_eq!(overrides.colour_depth, Some(ColourDepth::Eight));
        assert_eq!(overrides.sentinels, Some(SentinelMode::BeforeAndAfter));
        assert_eq!(overrides.sentinel_reuse, Some(SentinelReuse::AlwaysCreateNew));
    }
}

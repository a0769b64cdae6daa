//! Colour normalization shared by every equality check and palette insertion
//!
//! Hardware palettes only care whether a pixel is see-through, not which RGB
//! value the artist happened to leave under a zero alpha. All colour
//! comparisons in this crate go through [`canonical`] so that two alpha-0
//! pixels always compare equal.

use image::Rgba;
use serde::Serialize;

/// The canonical fully transparent colour
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Collapse every fully transparent colour onto [`TRANSPARENT`].
///
/// Colours with a non-zero alpha are returned unchanged.
///
/// # Examples
///
/// ```
/// use image::Rgba;
/// use tilebank::color::{canonical, TRANSPARENT};
///
/// assert_eq!(canonical(Rgba([255, 0, 255, 0])), TRANSPARENT);
/// assert_eq!(canonical(Rgba([255, 0, 255, 1])), Rgba([255, 0, 255, 1]));
/// ```
#[inline]
pub fn canonical(colour: Rgba<u8>) -> Rgba<u8> {
    if is_transparent(colour) {
        TRANSPARENT
    } else {
        colour
    }
}

/// True when the colour has zero alpha, regardless of its RGB channels.
#[inline]
pub fn is_transparent(colour: Rgba<u8>) -> bool {
    colour[3] == 0
}

/// Compare two colours under transparency canonicalization.
#[inline]
pub fn same_colour(a: Rgba<u8>, b: Rgba<u8>) -> bool {
    canonical(a) == canonical(b)
}

/// Format a colour as `#RRGGBB` (opaque) or `#RRGGBBAA`.
pub fn to_hex(colour: Rgba<u8>) -> String {
    let Rgba([r, g, b, a]) = colour;
    if a == 255 {
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    } else {
        format!("#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
    }
}

/// One slot of a merged palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub colour: Rgba<u8>,
    /// False only for padding added to complete a 16-colour bank
    pub is_used: bool,
}

impl PaletteEntry {
    /// An entry referenced by at least one tile.
    pub fn used(colour: Rgba<u8>) -> Self {
        Self {
            colour: canonical(colour),
            is_used: true,
        }
    }

    /// Gap filler for an incomplete bank.
    pub fn unused() -> Self {
        Self {
            colour: TRANSPARENT,
            is_used: false,
        }
    }
}

impl Serialize for PaletteEntry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("PaletteEntry", 2)?;
        state.serialize_field("colour", &to_hex(self.colour))?;
        state.serialize_field("used", &self.is_used)?;
        state.end()
    }
}

//! Character tiles
//!
//! A tile is one hardware character cell worth of pixels together with its
//! local palette and the grid that maps each pixel onto that palette.

use image::{Rgba, RgbaImage};

use crate::color::{canonical, is_transparent, TRANSPARENT};
use crate::grid::IndexedGrid;

#[derive(Debug, Clone)]
pub struct Tile {
    image: RgbaImage,
    colours: Vec<Rgba<u8>>,
    grid: IndexedGrid,
    fully_transparent: bool,
    index: usize,
    bank: usize,
    colours_per_bank: usize,
}

impl Tile {
    /// Build a tile from its pixels, deduplicating colours in scan order.
    ///
    /// The local palette is canonicalized, so every alpha-0 pixel shares a
    /// single [`TRANSPARENT`] entry.
    pub fn from_image(image: RgbaImage) -> Self {
        let mut colours: Vec<Rgba<u8>> = Vec::new();
        let mut grid = IndexedGrid::new();
        let mut fully_transparent = true;

        for y in 0..image.height() {
            grid.add_row();
            for x in 0..image.width() {
                let pixel = *image.get_pixel(x, y);
                if !is_transparent(pixel) {
                    fully_transparent = false;
                }

                let colour = canonical(pixel);
                let local = match colours.iter().position(|c| *c == colour) {
                    Some(i) => i,
                    None => {
                        colours.push(colour);
                        colours.len() - 1
                    }
                };
                grid.add_column(local);
            }
        }

        Self {
            image,
            colours,
            grid,
            fully_transparent,
            index: 0,
            bank: 0,
            colours_per_bank: 0,
        }
    }

    /// A fully transparent tile: one palette entry, every pixel at index 0.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
            colours: vec![TRANSPARENT],
            grid: IndexedGrid::prefill(width as usize, height as usize, 0),
            fully_transparent: true,
            index: 0,
            bank: 0,
            colours_per_bank: 0,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Local palette in first-seen order.
    pub fn colours(&self) -> &[Rgba<u8>] {
        &self.colours
    }

    /// Pixel to colour index grid. Local indices before merging; bank-local
    /// (4bpp) or global (8bpp) indices afterwards.
    pub fn grid(&self) -> &IndexedGrid {
        &self.grid
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.fully_transparent
    }

    /// Whether any pixel of this tile is transparent.
    pub fn has_transparent_colour(&self) -> bool {
        self.colours.contains(&TRANSPARENT)
    }

    /// Position of this tile in its registry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Bank assigned by a 4bpp merge, 0 otherwise.
    pub fn bank(&self) -> usize {
        self.bank
    }

    /// Bank size after a 4bpp merge, 0 otherwise.
    pub fn colours_per_bank(&self) -> usize {
        self.colours_per_bank
    }

    /// Translate a grid value into an index into the merged palette.
    pub fn global_colour_index(&self, value: usize) -> usize {
        self.bank * self.colours_per_bank + value
    }

    /// Pixel-identical under transparency canonicalization.
    pub fn same_pixels(&self, other: &Tile) -> bool {
        self.image.dimensions() == other.image.dimensions()
            && self
                .image
                .pixels()
                .zip(other.image.pixels())
                .all(|(a, b)| canonical(*a) == canonical(*b))
    }

    /// Canonicalized pixel bytes plus dimensions, used as a lookup key.
    pub(crate) fn pixel_key(&self) -> Vec<u8> {
        let (w, h) = self.image.dimensions();
        let mut key = Vec::with_capacity(8 + self.image.as_raw().len());
        key.extend_from_slice(&w.to_le_bytes());
        key.extend_from_slice(&h.to_le_bytes());
        for pixel in self.image.pixels() {
            key.extend_from_slice(&canonical(*pixel).0);
        }
        key
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn assign_bank(&mut self, bank: usize, colours_per_bank: usize) {
        self.bank = bank;
        self.colours_per_bank = colours_per_bank;
    }

    pub(crate) fn grid_mut(&mut self) -> &mut IndexedGrid {
        &mut self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn test_local_palette_first_seen_order() {
        let mut image = RgbaImage::from_pixel(2, 2, RED);
        image.put_pixel(1, 0, BLUE);
        image.put_pixel(0, 1, Rgba([1, 2, 3, 0]));

        let tile = Tile::from_image(image);
        assert_eq!(tile.colours(), &[RED, BLUE, TRANSPARENT]);
        assert_eq!(tile.grid().rows(), &[vec![0, 1], vec![2, 0]]);
        assert!(!tile.is_fully_transparent());
        assert!(tile.has_transparent_colour());
    }

    #[test]
    fn test_transparent_pixels_share_one_entry() {
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([9, 9, 9, 0]));
        image.put_pixel(1, 0, Rgba([7, 7, 7, 0]));

        let tile = Tile::from_image(image);
        assert_eq!(tile.colours(), &[TRANSPARENT]);
        assert!(tile.is_fully_transparent());
    }

    #[test]
    fn test_transparent_constructor() {
        let tile = Tile::transparent(8, 8);
        assert_eq!(tile.colours(), &[TRANSPARENT]);
        assert_eq!(tile.grid().width(), 8);
        assert_eq!(tile.grid().height(), 8);
        assert!(tile.grid().values().all(|v| v == 0));
        assert!(tile.is_fully_transparent());
    }

    #[test]
    fn test_same_pixels_ignores_rgb_under_zero_alpha() {
        let a = Tile::from_image(RgbaImage::from_pixel(2, 2, Rgba([1, 1, 1, 0])));
        let b = Tile::from_image(RgbaImage::from_pixel(2, 2, Rgba([200, 0, 0, 0])));
        let c = Tile::from_image(RgbaImage::from_pixel(2, 2, RED));
        assert!(a.same_pixels(&b));
        assert!(!a.same_pixels(&c));
        assert_eq!(a.pixel_key(), b.pixel_key());
    }

    #[test]
    fn test_same_pixels_requires_same_dimensions() {
        let a = Tile::from_image(RgbaImage::from_pixel(2, 1, RED));
        let b = Tile::from_image(RgbaImage::from_pixel(1, 2, RED));
        assert!(!a.same_pixels(&b));
        assert_ne!(a.pixel_key(), b.pixel_key());
    }

    #[test]
    fn test_global_colour_index() {
        let mut tile = Tile::from_image(RgbaImage::from_pixel(1, 1, RED));
        assert_eq!(tile.global_colour_index(3), 3);
        tile.assign_bank(2, 16);
        assert_eq!(tile.global_colour_index(3), 35);
    }
}

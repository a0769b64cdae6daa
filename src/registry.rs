//! Tile registry - the canonical, insertion-ordered list of unique tiles
//!
//! The registry applies the transparency and duplicate reuse policies, keeps
//! track of the canonical transparent tile, records same-bank groups for the
//! 4bpp merger and supports a single level of rollback.

use std::collections::HashMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tile::Tile;

/// What to do with a tile whose pixels are all transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransparencyPolicy {
    /// Reuse the canonical transparent tile instead of adding another
    #[default]
    OpaqueOnly,
    /// Add transparent tiles like any other
    KeepAll,
}

/// What to do with a tile that matches one already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Reuse the existing pixel-identical tile
    #[default]
    UniqueOnly,
    /// Add every tile
    KeepAll,
}

/// How a transparent sentinel tile is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SentinelReuse {
    /// Reuse the canonical transparent tile when there is one
    #[default]
    ReuseCanonical,
    /// Reuse only if the last registered tile is transparent
    ReuseIfImmediatelyPrevious,
    /// Always append a fresh transparent tile
    AlwaysCreateNew,
}

/// Outcome of offering a tile to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The tile was appended at this index
    Added(usize),
    /// The tile was transparent and the canonical transparent tile was reused
    ReusedTransparent(usize),
    /// A pixel-identical tile already existed at this index
    ReusedDuplicate(usize),
}

impl Insertion {
    /// Registry index the caller should reference.
    pub fn index(self) -> usize {
        match self {
            Insertion::Added(i)
            | Insertion::ReusedTransparent(i)
            | Insertion::ReusedDuplicate(i) => i,
        }
    }

    pub fn was_added(self) -> bool {
        matches!(self, Insertion::Added(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tile {index} does not exist (registry holds {len} tiles)")]
    UnknownTile { index: usize, len: usize },
}

/// Snapshot returned by [`TileRegistry::set_restore_point`].
///
/// Consumed by [`TileRegistry::reset_to_restore_point`], which discards
/// everything registered after the snapshot was taken.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a restore point does nothing unless passed back to reset_to_restore_point"]
pub struct RestorePoint {
    tiles: usize,
    groups: usize,
}

impl RestorePoint {
    /// Number of tiles registered when the snapshot was taken.
    pub fn tile_count(&self) -> usize {
        self.tiles
    }
}

#[derive(Debug, Default)]
pub struct TileRegistry {
    tiles: Vec<Tile>,
    canonical_transparent: Option<usize>,
    /// First registry index for each canonicalized pixel pattern
    lookup: HashMap<Vec<u8>, usize>,
    groups: Vec<Vec<usize>>,
    merged: bool,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all tiles, groups and merge state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// Index of the first transparent tile registered, if any.
    pub fn canonical_transparent(&self) -> Option<usize> {
        self.canonical_transparent
    }

    /// Same-bank groups in registration order.
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    /// Whether a palette merge has already consumed this registry.
    pub fn is_merged(&self) -> bool {
        self.merged
    }

    /// Offer a tile, applying the transparency policy first and the
    /// duplicate policy second.
    pub fn add(
        &mut self,
        tile: Tile,
        transparency: TransparencyPolicy,
        duplicates: DuplicatePolicy,
    ) -> Insertion {
        if transparency == TransparencyPolicy::OpaqueOnly && tile.is_fully_transparent() {
            if let Some(index) = self.canonical_transparent {
                return Insertion::ReusedTransparent(index);
            }
        }

        let key = tile.pixel_key();
        if duplicates == DuplicatePolicy::UniqueOnly {
            if let Some(&index) = self.lookup.get(&key) {
                return Insertion::ReusedDuplicate(index);
            }
        }

        Insertion::Added(self.push(tile, key))
    }

    /// Obtain a transparent `width` x `height` tile according to `rule`.
    pub fn add_transparent_image(
        &mut self,
        width: u32,
        height: u32,
        rule: SentinelReuse,
    ) -> Insertion {
        match rule {
            SentinelReuse::ReuseCanonical => {
                if let Some(index) = self.canonical_transparent {
                    return Insertion::ReusedTransparent(index);
                }
            }
            SentinelReuse::ReuseIfImmediatelyPrevious => {
                if let Some(last) = self.tiles.last() {
                    if last.is_fully_transparent() {
                        return Insertion::ReusedTransparent(last.index());
                    }
                }
            }
            SentinelReuse::AlwaysCreateNew => {}
        }

        let tile = Tile::transparent(width, height);
        let key = tile.pixel_key();
        Insertion::Added(self.push(tile, key))
    }

    /// Declare that the given tiles must share one 4bpp bank.
    ///
    /// Repeated indices inside the group are collapsed. Empty groups are
    /// ignored.
    pub fn require_same_bank<I>(&mut self, group: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut members: Vec<usize> = Vec::new();
        for index in group {
            if index >= self.tiles.len() {
                return Err(RegistryError::UnknownTile {
                    index,
                    len: self.tiles.len(),
                });
            }
            if !members.contains(&index) {
                members.push(index);
            }
        }

        if !members.is_empty() {
            self.groups.push(members);
        }
        Ok(())
    }

    /// Snapshot the current registry size.
    pub fn set_restore_point(&self) -> RestorePoint {
        RestorePoint {
            tiles: self.tiles.len(),
            groups: self.groups.len(),
        }
    }

    /// Discard every tile and group registered after `point` was taken.
    pub fn reset_to_restore_point(&mut self, point: RestorePoint) {
        if point.tiles < self.tiles.len() {
            log::debug!(
                "Rolling back {} tentative tile(s) to restore point at {}",
                self.tiles.len() - point.tiles,
                point.tiles
            );
            self.tiles.truncate(point.tiles);
            self.lookup.retain(|_, index| *index < point.tiles);
            if self.canonical_transparent.is_some_and(|i| i >= point.tiles) {
                self.canonical_transparent = None;
            }
        }
        self.groups.truncate(point.groups);
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub(crate) fn mark_merged(&mut self) {
        self.merged = true;
    }

    fn push(&mut self, mut tile: Tile, key: Vec<u8>) -> usize {
        let index = self.tiles.len();
        tile.set_index(index);
        if tile.is_fully_transparent() && self.canonical_transparent.is_none() {
            self.canonical_transparent = Some(index);
        }
        self.lookup.entry(key).or_insert(index);
        self.tiles.push(tile);
        index
    }
}

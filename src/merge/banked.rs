//! 4bpp merge: pack tiles into 16-colour banks.
//!
//! Packing is a greedy best-fit heuristic. Same-bank groups are placed first,
//! in registration order, then every remaining tile in registry order. A tile
//! goes to the existing bank that needs the fewest new colours to hold it;
//! ties go to the earliest bank. When nothing fits a new bank is opened.
//!
//! The whole packing is planned before any tile is touched, so a failed
//! merge leaves the registry exactly as it was.

use image::Rgba;
use serde::Serialize;

use crate::color::{to_hex, PaletteEntry, TRANSPARENT};
use crate::registry::TileRegistry;
use crate::tile::Tile;

use super::{remap_tile, ColourDepth, MergeError, MergeOptions, MergedPalette};

/// Colours per bank
pub const BANK_CAPACITY: usize = 16;

/// Banks available to 4bpp characters
pub const MAX_BANKS: usize = 16;

/// One 16-colour palette partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    index: usize,
    colours: Vec<Rgba<u8>>,
    members: Vec<usize>,
}

impl Bank {
    fn new(index: usize) -> Self {
        Self {
            index,
            colours: Vec::with_capacity(BANK_CAPACITY),
            members: Vec::new(),
        }
    }

    /// Creation order, which is also the bank's position in the palette.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Colours actually referenced, without padding.
    pub fn colours(&self) -> &[Rgba<u8>] {
        &self.colours
    }

    /// Registry indices of the tiles using this bank.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }
}

impl Serialize for Bank {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let colours: Vec<String> = self.colours.iter().map(|c| to_hex(*c)).collect();
        let mut state = serializer.serialize_struct("Bank", 3)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field("colours", &colours)?;
        state.serialize_field("members", &self.members)?;
        state.end()
    }
}

pub(super) fn merge(
    registry: &mut TileRegistry,
    options: &MergeOptions,
) -> Result<MergedPalette, MergeError> {
    let reserve = options.reserve_transparent;

    for tile in registry.tiles() {
        let required = required_colours(tile, reserve);
        if required > BANK_CAPACITY {
            return Err(MergeError::TooManyColoursInTile {
                tile: tile.index(),
                required,
                capacity: BANK_CAPACITY,
            });
        }
    }

    let mut packer = Packer::new(registry.tiles(), reserve);
    for (group, members) in registry.groups().iter().enumerate() {
        packer.place_group(group, members)?;
    }
    packer.place_ungrouped();
    let Packer {
        banks, placements, ..
    } = packer;

    if banks.len() > MAX_BANKS {
        return Err(MergeError::TooManyBanks {
            required: banks.len(),
            allowed: MAX_BANKS,
        });
    }
    if let Some(bank) = banks.iter().find(|b| b.len() > BANK_CAPACITY) {
        return Err(MergeError::BankOverflow {
            bank: bank.index,
            colours: bank.len(),
            capacity: BANK_CAPACITY,
        });
    }

    registry.mark_merged();
    for (tile, placement) in placements.into_iter().enumerate() {
        if let Some(Placement { bank, map }) = placement {
            remap_tile(registry, tile, &map)?;
            registry.tiles_mut()[tile].assign_bank(bank, BANK_CAPACITY);
        }
    }

    let mut entries = Vec::with_capacity(banks.len() * BANK_CAPACITY);
    for bank in &banks {
        entries.extend(bank.colours.iter().map(|&c| PaletteEntry::used(c)));
        entries.extend((bank.len()..BANK_CAPACITY).map(|_| PaletteEntry::unused()));
    }

    log::debug!(
        "Packed {} tile(s) into {} of {} bank(s), {} group(s)",
        registry.len(),
        banks.len(),
        MAX_BANKS,
        registry.groups().len()
    );

    Ok(MergedPalette {
        depth: ColourDepth::Four,
        entries,
        banks,
    })
}

/// Colours a tile occupies in an otherwise empty bank.
fn required_colours(tile: &Tile, reserve: bool) -> usize {
    let slot = usize::from(reserve && !tile.has_transparent_colour());
    tile.colours().len() + slot
}

/// Number of colours `tile` would add to `bank`, or `None` if it does not fit.
fn fit(bank: &[Rgba<u8>], tile: &Tile, reserve: bool) -> Option<usize> {
    let mut new = tile.colours().iter().filter(|c| !bank.contains(c)).count();
    if bank.is_empty() && reserve && !tile.has_transparent_colour() {
        new += 1;
    }

    if bank.len() + new <= BANK_CAPACITY {
        Some(new)
    } else {
        None
    }
}

/// Add the colours of `tile` to `bank` and return the local to bank slot map.
fn absorb(bank: &mut Vec<Rgba<u8>>, tile: &Tile, reserve: bool) -> Vec<usize> {
    if bank.is_empty() && reserve {
        bank.push(TRANSPARENT);
    }

    tile.colours()
        .iter()
        .map(|&colour| match bank.iter().position(|c| *c == colour) {
            Some(slot) => slot,
            None => {
                bank.push(colour);
                bank.len() - 1
            }
        })
        .collect()
}

struct Placement {
    bank: usize,
    map: Vec<usize>,
}

struct Packer<'a> {
    tiles: &'a [Tile],
    reserve: bool,
    banks: Vec<Bank>,
    placements: Vec<Option<Placement>>,
}

impl<'a> Packer<'a> {
    fn new(tiles: &'a [Tile], reserve: bool) -> Self {
        Self {
            tiles,
            reserve,
            banks: Vec::new(),
            placements: tiles.iter().map(|_| None).collect(),
        }
    }

    /// Existing bank needing the fewest new colours; earliest wins ties.
    fn best_bank(&self, tile: &Tile) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for bank in &self.banks {
            if let Some(new) = fit(&bank.colours, tile, self.reserve) {
                if best.map_or(true, |(_, fewest)| new < fewest) {
                    best = Some((bank.index, new));
                }
            }
        }
        best.map(|(bank, _)| bank)
    }

    fn open_bank(&mut self) -> usize {
        let index = self.banks.len();
        self.banks.push(Bank::new(index));
        index
    }

    fn commit(&mut self, bank: usize, tile: usize) {
        let target = &mut self.banks[bank];
        let map = absorb(&mut target.colours, &self.tiles[tile], self.reserve);
        target.members.push(tile);
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Tile {} -> bank {} ({} colours)", tile, bank, target.colours.len());
        }
        self.placements[tile] = Some(Placement { bank, map });
    }

    fn place_group(&mut self, group: usize, members: &[usize]) -> Result<(), MergeError> {
        let mut placed_in: Vec<usize> = Vec::new();
        for placement in members.iter().filter_map(|&m| self.placements[m].as_ref()) {
            if !placed_in.contains(&placement.bank) {
                placed_in.push(placement.bank);
            }
        }

        match placed_in.as_slice() {
            [] => {}
            [bank] => {
                // Overlaps an earlier group: join the bank it already chose
                let bank = *bank;
                for &member in members {
                    if self.placements[member].is_none() {
                        self.commit(bank, member);
                    }
                }
                return Ok(());
            }
            _ => return Err(MergeError::ConflictingGroup { group }),
        }

        let mut representative = members[0];
        for &member in &members[1..] {
            if self.tiles[member].colours().len() > self.tiles[representative].colours().len() {
                representative = member;
            }
        }

        if let Some(bank) = self.best_bank(&self.tiles[representative]) {
            let mut simulated = self.banks[bank].colours.clone();
            let all_fit = members.iter().all(|&member| {
                let tile = &self.tiles[member];
                if fit(&simulated, tile, self.reserve).is_some() {
                    absorb(&mut simulated, tile, self.reserve);
                    true
                } else {
                    false
                }
            });

            if all_fit {
                for &member in members {
                    self.commit(bank, member);
                }
                return Ok(());
            }
        }

        let bank = self.open_bank();
        log::debug!("Opened bank {} for group {}", bank, group);
        for &member in members {
            self.commit(bank, member);
        }
        Ok(())
    }

    fn place_ungrouped(&mut self) {
        for tile in 0..self.tiles.len() {
            if self.placements[tile].is_some() {
                continue;
            }
            let bank = match self.best_bank(&self.tiles[tile]) {
                Some(bank) => bank,
                None => {
                    let bank = self.open_bank();
                    log::debug!("Opened bank {} for tile {}", bank, tile);
                    bank
                }
            };
            self.commit(bank, tile);
        }
    }
}

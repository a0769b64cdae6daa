//! Indexed grids - 2D integer indirection layers
//!
//! The same structure holds both "which tile sits in this cell" maps produced
//! by the splitter and "which palette colour does this pixel use" maps owned
//! by each tile.

use thiserror::Error;

/// Error raised when a remap table does not cover a grid value.
///
/// This always points at a defect in the code that built the table; user
/// input cannot trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid value {value} at ({x}, {y}) is not covered by the remap table")]
    IndexNotInMapping { x: usize, y: usize, value: usize },
}

/// Receives change notifications while a grid is being remapped.
///
/// Both methods default to doing nothing, so implementors only override the
/// granularity they care about.
pub trait RemapObserver {
    /// Called once before the cells of row `y` are rewritten.
    fn row(&mut self, _y: usize) {}

    /// Called for every rewritten cell.
    fn cell(&mut self, _x: usize, _y: usize, _old: usize, _new: usize) {}
}

impl RemapObserver for () {}

/// A row-major grid of indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedGrid {
    rows: Vec<Vec<usize>>,
}

impl IndexedGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `width` x `height` grid with every cell set to `value`.
    pub fn prefill(width: usize, height: usize, value: usize) -> Self {
        Self {
            rows: vec![vec![value; width]; height],
        }
    }

    /// Build a grid from explicit rows.
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Self {
        Self { rows }
    }

    /// Width of the grid, taken from the first row.
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.width() == 0
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    /// Iterate all cells in row-major order.
    pub fn values(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.iter().flat_map(|row| row.iter().copied())
    }

    /// Start a new, empty row at the bottom of the grid.
    pub fn add_row(&mut self) {
        self.rows.push(Vec::new());
    }

    /// Append a value to the last row, starting the first row if needed.
    pub fn add_column(&mut self, value: usize) {
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        if let Some(row) = self.rows.last_mut() {
            row.push(value);
        }
    }

    /// Insert a row before row `at` (clamped to the height).
    ///
    /// `values` is padded with 0 or truncated to the current width. Inserting
    /// into a grid without rows adopts the length of `values` as the width.
    pub fn insert_row(&mut self, at: usize, values: &[usize]) {
        let width = if self.rows.is_empty() {
            values.len()
        } else {
            self.width()
        };
        let row = fit(values, width);
        let at = at.min(self.rows.len());
        self.rows.insert(at, row);
    }

    /// Insert a column before column `at` (clamped per row).
    ///
    /// `values` is padded with 0 or truncated to the current height.
    pub fn insert_column(&mut self, at: usize, values: &[usize]) {
        let column = fit(values, self.rows.len());
        for (row, value) in self.rows.iter_mut().zip(column) {
            let at = at.min(row.len());
            row.insert(at, value);
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<usize> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Set a single cell. Returns false if `(x, y)` is outside the grid.
    pub fn set(&mut self, x: usize, y: usize, value: usize) -> bool {
        match self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Rewrite every cell through `map`, indexed by the current value.
    pub fn remap(&mut self, map: &[usize]) -> Result<(), GridError> {
        self.remap_with(map, &mut ())
    }

    /// Rewrite every cell through `map`, reporting changes to `observer`.
    ///
    /// The whole grid is checked against `map` first; on error no cell has
    /// been modified.
    pub fn remap_with<O: RemapObserver + ?Sized>(
        &mut self,
        map: &[usize],
        observer: &mut O,
    ) -> Result<(), GridError> {
        for (y, row) in self.rows.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                if value >= map.len() {
                    return Err(GridError::IndexNotInMapping { x, y, value });
                }
            }
        }

        for (y, row) in self.rows.iter_mut().enumerate() {
            observer.row(y);
            for (x, cell) in row.iter_mut().enumerate() {
                let old = *cell;
                *cell = map[old];
                observer.cell(x, y, old, *cell);
            }
        }

        Ok(())
    }
}

fn fit(values: &[usize], len: usize) -> Vec<usize> {
    let mut out: Vec<usize> = values.iter().copied().take(len).collect();
    out.resize(len, 0);
    out
}

//! Grid geometry for the unit board.
//!
//! The board is a fixed rectangle of 1-indexed cells. Beds ring the perimeter
//! by default; staff cards live in the interior. Everything here is pure and
//! deterministic: the same size always yields the same cell sequence.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{DEFAULT_GRID_COLUMNS, DEFAULT_GRID_ROWS};

/// Dimensions of the unit board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: u16,
    pub columns: u16,
}

impl GridSize {
    pub const fn new(rows: u16, columns: u16) -> Self {
        Self { rows, columns }
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// Whether a single cell lies on the board.
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.row >= 1 && pos.column >= 1 && pos.row <= self.rows && pos.column <= self.columns
    }

    /// Whether a card anchored at `origin` lies entirely on the board.
    pub fn fits(&self, origin: GridPos, footprint: Footprint) -> bool {
        if footprint.height == 0 || footprint.width == 0 || !self.contains(origin) {
            return false;
        }
        let last_row = origin.row as u32 + footprint.height as u32 - 1;
        let last_column = origin.column as u32 + footprint.width as u32 - 1;
        last_row <= self.rows as u32 && last_column <= self.columns as u32
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_ROWS, DEFAULT_GRID_COLUMNS)
    }
}

/// A 1-indexed board cell. Serialized with the field names the layout store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    #[serde(rename = "grid_row")]
    pub row: u16,
    #[serde(rename = "grid_column")]
    pub column: u16,
}

impl GridPos {
    pub const fn new(row: u16, column: u16) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Rectangular set of cells a card covers, anchored at its top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub height: u16,
    pub width: u16,
}

impl Footprint {
    pub const fn new(height: u16, width: u16) -> Self {
        Self { height, width }
    }

    /// Cells covered when anchored at `origin`, top to bottom then left to right.
    /// Cells past the coordinate range are skipped.
    pub fn cells(self, origin: GridPos) -> impl Iterator<Item = GridPos> {
        (0..self.height).flat_map(move |dr| {
            (0..self.width).filter_map(move |dc| {
                Some(GridPos::new(
                    origin.row.checked_add(dr)?,
                    origin.column.checked_add(dc)?,
                ))
            })
        })
    }
}

pub const PATIENT_CARD: Footprint = Footprint::new(1, 1);
pub const NURSE_CARD: Footprint = Footprint::new(3, 1);
pub const TECH_CARD: Footprint = Footprint::new(1, 1);

/// Perimeter cells in clockwise order starting at the top-left corner.
///
/// Top row left→right, right column downward, bottom row right→left, left
/// column upward. Each cell appears exactly once, including on boards that
/// are a single row or column wide.
pub fn perimeter_cells(size: GridSize) -> Vec<GridPos> {
    let (rows, columns) = (size.rows, size.columns);
    if rows == 0 || columns == 0 {
        return Vec::new();
    }

    let mut cells = Vec::with_capacity(2 * (rows as usize + columns as usize));
    for c in 1..=columns {
        cells.push(GridPos::new(1, c));
    }
    for r in 2..=rows {
        cells.push(GridPos::new(r, columns));
    }
    if rows > 1 {
        for c in (1..columns).rev() {
            cells.push(GridPos::new(rows, c));
        }
    }
    if columns > 1 {
        for r in (2..rows).rev() {
            cells.push(GridPos::new(r, 1));
        }
    }
    cells
}

/// Every cell, top to bottom, left to right.
pub fn row_major_cells(size: GridSize) -> impl Iterator<Item = GridPos> {
    (1..=size.rows).flat_map(move |r| (1..=size.columns).map(move |c| GridPos::new(r, c)))
}

//! The world grid: a fixed rectangle of cells bounded by a wall perimeter.
//!
//! The [`Grid`] stores cells row-major in a single vector. Row 0, the last
//! row, column 0 and the last column form the wall; everything else is the
//! playable interior. Dimensions are fixed at construction.
//!
//! The grid carries no game rules. It only enforces the two cell
//! invariants: wall cells are never owned, and a trail cell always has an
//! owner.

use std::ops::Range;

use ouroboros_types::{Cell, CellPos, Heading, PlayerId};

use crate::error::WorldError;

/// Smallest legal side length (one interior cell plus two walls).
const MIN_SIDE: usize = 3;

/// The shared playfield.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Row count, walls included.
    rows: usize,
    /// Column count, walls included.
    cols: usize,
    /// Row-major cell storage.
    cells: Vec<Cell>,
}

impl Grid {
    /// Allocate a grid of `rows` x `cols` cells, walls included.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either side is smaller
    /// than 3, or [`WorldError::TooLarge`] if the cell count overflows.
    pub fn new(rows: usize, cols: usize) -> Result<Self, WorldError> {
        if rows < MIN_SIDE || cols < MIN_SIDE {
            return Err(WorldError::InvalidDimensions { rows, cols });
        }
        let total = rows
            .checked_mul(cols)
            .ok_or(WorldError::TooLarge { rows, cols })?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(total)
            .map_err(|_err| WorldError::TooLarge { rows, cols })?;
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell::new(CellPos::new(row, col)));
            }
        }

        Ok(Self { rows, cols, cells })
    }

    /// Row count, walls included.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Column count, walls included.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells, walls included.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false: a constructed grid has at least nine cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of playable (non-wall) cells.
    pub const fn interior_area(&self) -> usize {
        self.rows
            .saturating_sub(2)
            .saturating_mul(self.cols.saturating_sub(2))
    }

    /// The interior cell closest to the middle of the grid.
    pub const fn center(&self) -> CellPos {
        CellPos::new(self.rows / 2, self.cols / 2)
    }

    /// Whether `pos` addresses a cell of this grid (wall or interior).
    pub const fn contains(&self, pos: CellPos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Whether `pos` is on the wall perimeter or outside the grid.
    pub const fn is_wall(&self, pos: CellPos) -> bool {
        !self.contains(pos)
            || pos.row == 0
            || pos.col == 0
            || pos.row == self.rows.saturating_sub(1)
            || pos.col == self.cols.saturating_sub(1)
    }

    /// Whether `pos` is a playable cell.
    pub const fn is_interior(&self, pos: CellPos) -> bool {
        !self.is_wall(pos)
    }

    /// Row-major index of `pos`, if it lies on the grid.
    pub fn index_of(&self, pos: CellPos) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        pos.row
            .checked_mul(self.cols)
            .and_then(|base| base.checked_add(pos.col))
    }

    /// The cell at `pos`.
    pub fn cell(&self, pos: CellPos) -> Option<&Cell> {
        self.index_of(pos).and_then(|idx| self.cells.get(idx))
    }

    fn cell_mut(&mut self, pos: CellPos) -> Option<&mut Cell> {
        self.index_of(pos).and_then(|idx| self.cells.get_mut(idx))
    }

    /// Current owner of the cell at `pos`.
    pub fn owner(&self, pos: CellPos) -> Option<PlayerId> {
        self.cell(pos).and_then(|cell| cell.owner)
    }

    /// Iterate the in-grid orthogonal neighbours of `pos`.
    pub fn neighbors(&self, pos: CellPos) -> impl Iterator<Item = CellPos> + '_ {
        Heading::ALL
            .into_iter()
            .filter_map(move |heading| pos.step(heading))
            .filter(|next| self.contains(*next))
    }

    /// Iterate every cell, walls included, row-major.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Iterate the coordinates of all playable cells.
    pub fn interior_positions(&self) -> impl Iterator<Item = CellPos> + '_ {
        let last_row = self.rows.saturating_sub(1);
        let last_col = self.cols.saturating_sub(1);
        (1..last_row).flat_map(move |row| (1..last_col).map(move |col| CellPos::new(row, col)))
    }

    /// Mark `pos` as an open trail cell of `owner`, overwriting any previous
    /// owner. Returns `false` (and changes nothing) for wall cells.
    pub fn lay_trail(&mut self, pos: CellPos, owner: PlayerId, heading: Heading) -> bool {
        if self.is_wall(pos) {
            return false;
        }
        let Some(cell) = self.cell_mut(pos) else {
            return false;
        };
        cell.owner = Some(owner);
        cell.is_trail = true;
        cell.heading = Some(heading);
        true
    }

    /// Mark `pos` as consolidated territory of `owner`, overwriting any
    /// previous owner. Returns `false` for wall cells.
    pub fn claim_territory(&mut self, pos: CellPos, owner: PlayerId) -> bool {
        if self.is_wall(pos) {
            return false;
        }
        let Some(cell) = self.cell_mut(pos) else {
            return false;
        };
        cell.owner = Some(owner);
        cell.is_trail = false;
        true
    }

    /// Demote a trail cell of `owner` to consolidated territory.
    ///
    /// Returns `true` if the cell is owned by `owner` afterwards.
    pub fn consolidate(&mut self, pos: CellPos, owner: PlayerId) -> bool {
        match self.cell_mut(pos) {
            Some(cell) if cell.owner == Some(owner) => {
                cell.is_trail = false;
                true
            }
            _ => false,
        }
    }

    /// Clear the cell at `pos` if (and only if) `owner` still holds it.
    ///
    /// Returns `true` if the cell was released.
    pub fn release(&mut self, pos: CellPos, owner: PlayerId) -> bool {
        match self.cell_mut(pos) {
            Some(cell) if cell.owner == Some(owner) => {
                cell.owner = None;
                cell.is_trail = false;
                cell.heading = None;
                true
            }
            _ => false,
        }
    }

    /// Copy a rectangular viewport of cells.
    ///
    /// Ranges are clamped to the grid; an empty intersection yields an empty
    /// vector. The copy never aliases grid storage.
    pub fn snapshot(&self, rows: Range<usize>, cols: Range<usize>) -> Vec<Vec<Cell>> {
        let row_end = rows.end.min(self.rows);
        let col_end = cols.end.min(self.cols);
        if rows.start >= row_end || cols.start >= col_end {
            return Vec::new();
        }

        (rows.start..row_end)
            .map(|row| {
                (cols.start..col_end)
                    .filter_map(|col| self.cell(CellPos::new(row, col)).cloned())
                    .collect()
            })
            .collect()
    }
}

impl AsRef<Self> for Grid {
    fn as_ref(&self) -> &Self {
        self
    }
}

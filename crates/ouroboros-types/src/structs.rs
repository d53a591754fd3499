//! Grid coordinates and cell records.

use serde::{Deserialize, Serialize};

use crate::enums::Heading;
use crate::ids::PlayerId;

/// A `(row, col)` coordinate on the world grid.
///
/// Coordinates are unsigned; stepping off row or column 0 yields `None`
/// rather than wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPos {
    /// Row index (0 = top wall).
    pub row: usize,
    /// Column index (0 = left wall).
    pub col: usize,
}

impl CellPos {
    /// Create a coordinate.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The neighbouring coordinate one step in `heading`, if it does not
    /// underflow or overflow.
    pub fn step(self, heading: Heading) -> Option<Self> {
        match heading {
            Heading::Up => self.row.checked_sub(1).map(|row| Self::new(row, self.col)),
            Heading::Down => self.row.checked_add(1).map(|row| Self::new(row, self.col)),
            Heading::Left => self.col.checked_sub(1).map(|col| Self::new(self.row, col)),
            Heading::Right => self.col.checked_add(1).map(|col| Self::new(self.row, col)),
        }
    }

    /// Manhattan (L1) distance to `other`.
    pub const fn manhattan(self, other: Self) -> usize {
        self.row
            .abs_diff(other.row)
            .saturating_add(self.col.abs_diff(other.col))
    }

    /// Chebyshev (L-infinity) distance to `other`.
    pub fn chebyshev(self, other: Self) -> usize {
        self.row
            .abs_diff(other.row)
            .max(self.col.abs_diff(other.col))
    }
}

impl core::fmt::Display for CellPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One square of the world grid.
///
/// Invariants maintained by the world crate: a trail cell always has an
/// owner, and a wall-perimeter cell never has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Where this cell sits on the grid.
    pub pos: CellPos,
    /// The player currently owning this cell, if any.
    pub owner: Option<PlayerId>,
    /// Whether the cell is part of its owner's open trail (claimed but not
    /// yet consolidated).
    pub is_trail: bool,
    /// Heading of the last player to lay trail here (rendering hint only).
    pub heading: Option<Heading>,
}

impl Cell {
    /// Create an unclaimed cell.
    pub const fn new(pos: CellPos) -> Self {
        Self {
            pos,
            owner: None,
            is_trail: false,
            heading: None,
        }
    }

    /// Whether `player` owns this cell.
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    /// Whether this cell is consolidated territory of `player`.
    pub fn is_territory_of(&self, player: PlayerId) -> bool {
        self.is_owned_by(player) && !self.is_trail
    }

    /// Whether this cell is an open trail cell of someone other than `player`.
    pub fn is_foreign_trail(&self, player: PlayerId) -> bool {
        self.is_trail && self.owner.is_some_and(|owner| owner != player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_does_not_underflow() {
        let origin = CellPos::new(0, 0);
        assert_eq!(origin.step(Heading::Up), None);
        assert_eq!(origin.step(Heading::Left), None);
        assert_eq!(origin.step(Heading::Down), Some(CellPos::new(1, 0)));
        assert_eq!(origin.step(Heading::Right), Some(CellPos::new(0, 1)));
    }

    #[test]
    fn distances() {
        let a = CellPos::new(2, 3);
        let b = CellPos::new(5, 1);
        assert_eq!(a.manhattan(b), 5);
        assert_eq!(a.chebyshev(b), 3);
        assert_eq!(a.manhattan(a), 0);
    }

    #[test]
    fn ownership_predicates() {
        let me = PlayerId::new(1);
        let them = PlayerId::new(2);
        let mut cell = Cell::new(CellPos::new(1, 1));
        assert!(!cell.is_owned_by(me));

        cell.owner = Some(them);
        cell.is_trail = true;
        assert!(cell.is_foreign_trail(me));
        assert!(!cell.is_foreign_trail(them));
        assert!(!cell.is_territory_of(them));

        cell.is_trail = false;
        assert!(cell.is_territory_of(them));
    }
}

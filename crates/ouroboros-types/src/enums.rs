//! Enumeration types for the Ouroboros simulation.

use serde::{Deserialize, Serialize};

/// One of the four orthogonal movement directions.
///
/// Rows grow downward and columns grow to the right, so [`Heading::Up`]
/// decreases the row index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Heading {
    /// Toward row 0.
    Up,
    /// Toward the last row.
    Down,
    /// Toward column 0.
    Left,
    /// Toward the last column.
    Right,
}

impl Heading {
    /// All headings in a fixed evaluation order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Return the heading pointing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Whether turning from `self` to `next` would reverse onto the trail.
    pub const fn is_reversed_by(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Up, Self::Down)
                | (Self::Down, Self::Up)
                | (Self::Left, Self::Right)
                | (Self::Right, Self::Left)
        )
    }
}

//! World grid and enclosure search for the Ouroboros territory simulation.
//!
//! This crate models the physical playfield: a fixed rectangle of cells
//! bounded by a one-cell wall perimeter, plus the search machinery that
//! finds pockets of cells sealed off by a player's trail and territory.
//!
//! # Modules
//!
//! - [`arena`] -- Pooled, generation-stamped visited markers so concurrent
//!   searches do not allocate per run.
//! - [`error`] -- Error types for grid construction and access.
//! - [`grid`] -- The [`Grid`] itself: cell storage, wall checks, ownership
//!   mutation, and viewport snapshots.
//! - [`pocket`] -- Bounded breadth-first pocket search and the concurrent
//!   first-pocket finder with cooperative cancellation.

pub mod arena;
pub mod error;
pub mod grid;
pub mod pocket;

// Re-export primary types at crate root.
pub use arena::{VisitArena, VisitLease};
pub use error::WorldError;
pub use grid::Grid;
pub use pocket::{PocketFinder, SearchOutcome, search_pocket};

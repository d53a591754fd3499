//! Shared type definitions for the Ouroboros territory simulation.
//!
//! This crate is the single source of truth for the value types exchanged
//! between the world grid, the player logic, the tick engine, and the
//! collaborators that sit outside the simulation core (renderers, session
//! handlers, score persistence).
//!
//! # Modules
//!
//! - [`ids`] -- The [`PlayerId`] identifier (doubles as the player's color key)
//! - [`enums`] -- [`Heading`] and its geometry helpers
//! - [`structs`] -- Grid coordinates and cell records
//! - [`events`] -- Per-player notifications and score records

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::Heading;
pub use events::{DeathNotice, HeadingRequest, PlayerEvent, ScoreRecord};
pub use ids::PlayerId;
pub use structs::{Cell, CellPos};

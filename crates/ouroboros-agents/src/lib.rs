//! Players and the rules that act on them for the Ouroboros simulation.
//!
//! This crate sits between the raw [`ouroboros_world::Grid`] and the tick
//! driver in `ouroboros-core`. It owns the player table and every
//! operation that reads or rewrites a player's cells outside ordinary
//! movement.
//!
//! # Modules
//!
//! - [`config`] -- Strategy weights and spawn tunables.
//! - [`error`] -- Error types for placement and lookup.
//! - [`lifecycle`] -- Sunset (release and remove) and rebirth primitives.
//! - [`player`] -- The [`Player`] record and its per-player bookkeeping.
//! - [`spawn`] -- Spawn cell sampling and home territory placement.
//! - [`state`] -- [`WorldState`]: grid, player table, and randomness.
//! - [`strategy`] -- The [`Strategy`] trait and the rule-cascade bot.
//! - [`territory`] -- The Territory Filler: seed gathering, pocket race,
//!   and the claim pass.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod player;
pub mod spawn;
pub mod state;
pub mod strategy;
pub mod territory;

// Re-export primary types at crate root.
pub use config::{SpawnConfig, StrategyConfig};
pub use error::AgentError;
pub use lifecycle::{DeathReport, rebirth_player, sunset_player};
pub use player::Player;
pub use spawn::{choose_spawn, place_player, spawn_available};
pub use state::WorldState;
pub use strategy::{HeuristicStrategy, Strategy};
pub use territory::{FillOutcome, TerritoryFiller, claim_pocket, trail_seeds};

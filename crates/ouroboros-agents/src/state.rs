//! The shared world state: grid plus player table.
//!
//! One [`WorldState`] sits behind the simulation's `RwLock`. Readers (bot
//! decisions, pocket searches, snapshots) hold read guards; tick
//! resolution, fill claiming, sunset and rebirth hold the write guard.

use std::collections::BTreeMap;

use ouroboros_types::{CellPos, PlayerId};
use ouroboros_world::Grid;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::player::Player;

/// Grid and live-player registry.
#[derive(Debug)]
pub struct WorldState {
    /// The playfield.
    pub grid: Grid,
    /// Player table keyed by identifier. Dead players stay here until
    /// they are sunset.
    pub players: BTreeMap<PlayerId, Player>,
    /// Randomness for spawn sampling and initial headings.
    pub rng: StdRng,
}

impl WorldState {
    /// Wrap `grid` with an empty player table. A `seed` makes spawns
    /// reproducible.
    pub fn new(grid: Grid, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(|| StdRng::from_rng(&mut rand::rng()), StdRng::seed_from_u64);
        Self {
            grid,
            players: BTreeMap::new(),
            rng,
        }
    }

    /// Look up a player, dead or alive.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Mutable lookup.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Whether `id` names a player that is still alive.
    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.players.get(&id).is_some_and(|p| p.alive)
    }

    /// Iterate players that are still alive.
    pub fn live_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.alive)
    }

    /// The living player whose head is on `pos`, other than `except`.
    pub fn head_at(&self, pos: CellPos, except: Option<PlayerId>) -> Option<PlayerId> {
        self.live_players()
            .find(|p| p.location == pos && Some(p.id) != except)
            .map(|p| p.id)
    }
}

impl AsRef<Grid> for WorldState {
    fn as_ref(&self) -> &Grid {
        &self.grid
    }
}

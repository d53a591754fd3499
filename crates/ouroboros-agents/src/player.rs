//! Player records.
//!
//! A [`Player`] is owned by the player table in
//! [`WorldState`](crate::state::WorldState). Cells refer back to it by
//! [`PlayerId`] only.

use std::collections::BTreeSet;
use std::sync::Arc;

use ouroboros_types::{CellPos, Heading, PlayerId};
use ouroboros_world::Grid;

use crate::strategy::Strategy;

/// A live (or dying) participant.
#[derive(Debug, Clone)]
pub struct Player {
    /// Slot identifier and color key.
    pub id: PlayerId,

    /// Display name.
    pub name: String,

    /// Direction of the next move.
    pub heading: Heading,

    /// Current head cell.
    pub location: CellPos,

    /// Open trail cells in traversal order.
    pub trail: Vec<CellPos>,

    /// Every cell ever consolidated as this player's territory. Cells lost
    /// to other players stay here until pruned.
    pub claimed: BTreeSet<CellPos>,

    /// Kills credited to this player.
    pub kills: u32,

    /// Cleared exactly once, when the player dies.
    pub alive: bool,

    /// Set while standing inside own territory; such players cannot be cut.
    pub safe: bool,

    /// Signed speed. Negative `-n` moves once every `n + 1` ticks.
    pub speed: i8,

    /// Ticks skipped since the last move (slow motion only).
    pub skipped_ticks: u8,

    /// Decision strategy; `None` means human-controlled.
    pub strategy: Option<Arc<dyn Strategy>>,
}

impl Player {
    /// Create a player standing on `location`.
    ///
    /// The caller is responsible for marking the home cells on the grid
    /// and recording them in [`claimed`](Self::claimed).
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        location: CellPos,
        heading: Heading,
        strategy: Option<Arc<dyn Strategy>>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            heading,
            location,
            trail: Vec::new(),
            claimed: BTreeSet::new(),
            kills: 0,
            alive: true,
            safe: true,
            speed: 0,
            skipped_ticks: 0,
            strategy,
        }
    }

    /// Whether a strategy drives this player.
    pub const fn is_bot(&self) -> bool {
        self.strategy.is_some()
    }

    /// Mark the player dead. Returns `true` only for the call that
    /// actually killed it.
    pub const fn kill(&mut self) -> bool {
        let was_alive = self.alive;
        self.alive = false;
        was_alive
    }

    /// Turn to `heading` unless it reverses the current one.
    ///
    /// Returns whether the heading was applied.
    pub fn turn(&mut self, heading: Heading) -> bool {
        if self.heading.is_reversed_by(heading) {
            return false;
        }
        self.heading = heading;
        true
    }

    /// Credit one kill.
    pub const fn add_kill(&mut self) {
        self.kills = self.kills.saturating_add(1);
    }

    /// Advance the slow-motion counter. Returns `true` when the player
    /// moves this tick.
    pub fn ready_to_move(&mut self) -> bool {
        if self.speed >= 0 {
            return true;
        }
        let wait = self.speed.unsigned_abs();
        if self.skipped_ticks >= wait {
            self.skipped_ticks = 0;
            true
        } else {
            self.skipped_ticks = self.skipped_ticks.saturating_add(1);
            false
        }
    }

    /// Drop `pos` from the open trail (it was cut or captured).
    pub fn remove_from_trail(&mut self, pos: CellPos) {
        self.trail.retain(|cell| *cell != pos);
    }

    /// Count claimed cells the player still owns on `grid`.
    pub fn territory_size(&self, grid: &Grid) -> usize {
        self.claimed
            .iter()
            .filter(|pos| grid.owner(**pos) == Some(self.id))
            .count()
    }

    /// Forget claimed cells that now belong to someone else and return the
    /// remaining territory size.
    pub fn prune_claimed(&mut self, grid: &Grid) -> usize {
        let id = self.id;
        self.claimed.retain(|pos| grid.owner(*pos) == Some(id));
        self.claimed.len()
    }

    /// Percentage of the playable area covered by `cells`.
    pub fn claimed_percentage(cells: usize, grid: &Grid) -> f64 {
        let area = grid.interior_area();
        if area == 0 {
            return 0.0;
        }
        let cells = u32::try_from(cells).unwrap_or(u32::MAX);
        let area = u32::try_from(area).unwrap_or(u32::MAX);
        f64::from(cells) * 100.0 / f64::from(area)
    }
}

//! Spawn cell selection and player placement.
//!
//! New players are dropped as far from everyone else as a random sample
//! allows: `samples` unclaimed interior cells are drawn away from the wall
//! and the one maximizing the minimum Manhattan distance to any live head
//! wins. If sampling finds nothing (a crowded or tiny grid) the first
//! unclaimed interior cell is used instead.

use std::sync::Arc;

use ouroboros_types::{CellPos, Heading, PlayerId};
use ouroboros_world::Grid;
use rand::Rng;
use tracing::debug;

use crate::config::SpawnConfig;
use crate::error::AgentError;
use crate::player::Player;
use crate::state::WorldState;
use crate::strategy::Strategy;

/// Half-open sampling range along one axis of length `len`, keeping
/// `margin` cells clear of the wall where the axis allows it.
fn sample_range(len: usize, margin: usize) -> (usize, usize) {
    let lo = margin.max(1);
    let hi = len.saturating_sub(lo);
    if lo < hi {
        (lo, hi)
    } else {
        (1, len.saturating_sub(1))
    }
}

/// Smallest Manhattan distance from `pos` to any live player's head.
fn nearest_head_distance(state: &WorldState, pos: CellPos) -> usize {
    state
        .live_players()
        .map(|p| p.location.manhattan(pos))
        .min()
        .unwrap_or(usize::MAX)
}

fn is_free(grid: &Grid, pos: CellPos) -> bool {
    grid.is_interior(pos) && grid.owner(pos).is_none()
}

/// Whether a spawn cell would exist once `vacating` releases its cells.
///
/// Pass the identifier about to be sunset so its cells count as free.
pub fn spawn_available(grid: &Grid, vacating: PlayerId) -> bool {
    grid.interior_positions()
        .any(|pos| grid.owner(pos).is_none_or(|owner| owner == vacating))
}

/// Pick a spawn cell for `player_id`.
///
/// # Errors
///
/// Returns [`AgentError::NoSpawnCell`] when no unclaimed interior cell is
/// left.
pub fn choose_spawn(
    state: &mut WorldState,
    config: &SpawnConfig,
    player_id: PlayerId,
) -> Result<CellPos, AgentError> {
    let (row_lo, row_hi) = sample_range(state.grid.rows(), config.safe_margin);
    let (col_lo, col_hi) = sample_range(state.grid.cols(), config.safe_margin);

    let mut best: Option<(CellPos, usize)> = None;
    for _ in 0..config.samples {
        let pos = CellPos::new(
            state.rng.random_range(row_lo..row_hi),
            state.rng.random_range(col_lo..col_hi),
        );
        if !is_free(&state.grid, pos) {
            continue;
        }
        let dist = nearest_head_distance(state, pos);
        if best.is_none_or(|(_, best_dist)| dist > best_dist) {
            best = Some((pos, dist));
        }
    }

    if let Some((pos, dist)) = best {
        debug!(player_id = %player_id, spawn = %pos, nearest_head = dist, "spawn cell sampled");
        return Ok(pos);
    }

    state
        .grid
        .interior_positions()
        .find(|pos| state.grid.owner(*pos).is_none())
        .ok_or(AgentError::NoSpawnCell { player_id })
}

/// Create a player under `id` at a fresh spawn cell and register it.
///
/// The spawn cell and every unclaimed interior cell within
/// `home_radius` (Chebyshev) become the player's territory. The initial
/// heading is random. Any existing record under `id` is replaced, so
/// callers sunset the previous occupant first.
///
/// # Errors
///
/// Returns [`AgentError::NoSpawnCell`] when the grid is full.
pub fn place_player<'a>(
    state: &'a mut WorldState,
    config: &SpawnConfig,
    id: PlayerId,
    name: String,
    strategy: Option<Arc<dyn Strategy>>,
) -> Result<&'a Player, AgentError> {
    let spawn = choose_spawn(state, config, id)?;
    let heading = Heading::ALL
        .get(state.rng.random_range(0..Heading::ALL.len()))
        .copied()
        .unwrap_or(Heading::Up);

    let mut player = Player::new(id, name, spawn, heading, strategy);

    let radius = config.home_radius;
    let home: Vec<CellPos> = (spawn.row.saturating_sub(radius)..=spawn.row.saturating_add(radius))
        .flat_map(|row| {
            (spawn.col.saturating_sub(radius)..=spawn.col.saturating_add(radius))
                .map(move |col| CellPos::new(row, col))
        })
        .filter(|pos| *pos == spawn || is_free(&state.grid, *pos))
        .collect();

    for pos in home {
        if state.grid.claim_territory(pos, id) {
            player.claimed.insert(pos);
        }
    }

    debug!(
        player_id = %id,
        name = %player.name,
        spawn = %spawn,
        home = player.claimed.len(),
        bot = player.is_bot(),
        "player placed"
    );

    state.players.insert(id, player);
    state.players.get(&id).ok_or(AgentError::PlayerNotFound(id))
}

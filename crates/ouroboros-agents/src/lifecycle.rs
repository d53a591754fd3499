//! Sunset and rebirth primitives.
//!
//! These functions mutate a [`WorldState`] the caller already holds
//! exclusively. The simulation runs them on its lifecycle worker pools;
//! they carry no queueing or notification logic of their own.

use std::sync::Arc;

use ouroboros_types::{CellPos, PlayerId};
use tracing::{debug, info};

use crate::config::SpawnConfig;
use crate::error::AgentError;
use crate::player::Player;
use crate::spawn::place_player;
use crate::state::WorldState;
use crate::strategy::Strategy;

/// Final statistics of a removed player.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathReport {
    /// The removed player.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Territory cells still owned at removal.
    pub claimed_cells: usize,
    /// `claimed_cells` as a percentage of the playable area.
    pub claimed_percentage: f64,
    /// Kills credited over the player's life.
    pub kills: u32,
    /// Whether a strategy drove the player.
    pub was_bot: bool,
}

/// Remove `id` from the registry and release every cell it still owns.
///
/// Works for dead and live players alike. Returns `None` if `id` is not
/// registered, which makes repeated calls harmless.
pub fn sunset_player(state: &mut WorldState, id: PlayerId) -> Option<DeathReport> {
    let player = state.players.remove(&id)?;

    let claimed_cells = player.territory_size(&state.grid);
    let claimed_percentage = Player::claimed_percentage(claimed_cells, &state.grid);

    let mut released = 0_usize;
    let owned = player
        .claimed
        .iter()
        .chain(player.trail.iter())
        .chain(core::iter::once(&player.location));
    for pos in owned {
        if state.grid.release(*pos, id) {
            released = released.saturating_add(1);
        }
    }

    info!(
        player_id = %id,
        name = %player.name,
        claimed = claimed_cells,
        kills = player.kills,
        released,
        "player sunset"
    );

    Some(DeathReport {
        player_id: id,
        name: player.name,
        claimed_cells,
        claimed_percentage,
        kills: player.kills,
        was_bot: player.strategy.is_some(),
    })
}

/// Recreate a bot under `id` at a new spawn cell.
///
/// Returns `Ok(None)` without touching anything if `id` is already
/// registered.
///
/// # Errors
///
/// Returns [`AgentError::NoSpawnCell`] when the grid is full.
pub fn rebirth_player(
    state: &mut WorldState,
    config: &SpawnConfig,
    id: PlayerId,
    name: String,
    strategy: Arc<dyn Strategy>,
) -> Result<Option<CellPos>, AgentError> {
    if state.players.contains_key(&id) {
        debug!(player_id = %id, "rebirth skipped, slot occupied");
        return Ok(None);
    }
    let player = place_player(state, config, id, name, Some(strategy))?;
    Ok(Some(player.location))
}

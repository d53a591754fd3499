//! The Territory Filler.
//!
//! When a player re-enters its own territory with an open trail, the trail
//! plus the existing territory may seal off a pocket. [`TerritoryFiller`]
//! finds it and converts it:
//!
//! 1. Under a read guard, every neighbour of a trail cell that the player
//!    does not own becomes a seed.
//! 2. The shared [`PocketFinder`] races one bounded search per seed and
//!    reports the first sealed pocket. Nothing is written while searches
//!    run.
//! 3. Under the write guard, [`claim_pocket`] re-validates the pocket,
//!    claims it, and consolidates the trail into territory.
//!
//! Only one pocket is claimed per fill even when a loop seals several.

use std::collections::BTreeSet;
use std::sync::Arc;

use ouroboros_types::{CellPos, PlayerId};
use ouroboros_world::PocketFinder;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::state::WorldState;

/// What a fill did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// A pocket was claimed and the trail consolidated.
    Claimed {
        /// Pocket cells that changed hands.
        pocket: usize,
        /// Trail cells turned into territory.
        consolidated: usize,
    },
    /// No sealed pocket was found (or it went stale); the trail was still
    /// consolidated.
    Consolidated {
        /// Trail cells turned into territory.
        consolidated: usize,
    },
    /// Nothing to do: the player is gone, dead, or has no open trail.
    Skipped,
}

/// Candidate seeds: in-grid neighbours of `id`'s trail cells that `id`
/// does not own, deduplicated and in grid order.
pub fn trail_seeds(state: &WorldState, id: PlayerId) -> Vec<CellPos> {
    let Some(player) = state.player(id) else {
        return Vec::new();
    };
    let grid = &state.grid;
    player
        .trail
        .iter()
        .flat_map(|cell| grid.neighbors(*cell))
        .filter(|pos| grid.is_interior(*pos) && grid.owner(*pos) != Some(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Whether every neighbour of every cell in `pocket` is inside the pocket
/// or owned by `id`, with no cell on the wall.
fn still_sealed(state: &WorldState, id: PlayerId, pocket: &BTreeSet<CellPos>) -> bool {
    let grid = &state.grid;
    pocket.iter().all(|pos| {
        grid.is_interior(*pos)
            && grid
                .neighbors(*pos)
                .all(|next| pocket.contains(&next) || grid.owner(next) == Some(id))
    })
}

/// Claim `pocket` for `id` (if still valid) and consolidate its trail.
///
/// The caller holds the world exclusively. A pocket that is no longer
/// sealed is dropped; cells inside it that have become another player's
/// trail or head are left alone. With an empty trail this is a no-op.
pub fn claim_pocket(state: &mut WorldState, id: PlayerId, pocket: Option<Vec<CellPos>>) -> FillOutcome {
    match state.player(id) {
        Some(player) if player.alive && !player.trail.is_empty() => {}
        _ => return FillOutcome::Skipped,
    }

    let mut claimed_cells = Vec::new();
    if let Some(cells) = pocket {
        let pocket: BTreeSet<CellPos> = cells.into_iter().collect();
        if still_sealed(state, id, &pocket) {
            for pos in pocket {
                let blocked = state.grid.cell(pos).is_some_and(|c| c.is_foreign_trail(id))
                    || state.head_at(pos, Some(id)).is_some();
                if !blocked && state.grid.claim_territory(pos, id) {
                    claimed_cells.push(pos);
                }
            }
        } else {
            debug!(player_id = %id, "pocket went stale before claim");
        }
    }

    let WorldState { grid, players, .. } = state;
    let Some(player) = players.get_mut(&id) else {
        return FillOutcome::Skipped;
    };

    let pocket = claimed_cells.len();
    player.claimed.extend(claimed_cells);

    let mut consolidated = 0_usize;
    for pos in core::mem::take(&mut player.trail) {
        if grid.consolidate(pos, id) {
            player.claimed.insert(pos);
            consolidated = consolidated.saturating_add(1);
        }
    }

    if pocket > 0 {
        FillOutcome::Claimed {
            pocket,
            consolidated,
        }
    } else {
        FillOutcome::Consolidated { consolidated }
    }
}

/// Runs fills against the shared world.
#[derive(Debug)]
pub struct TerritoryFiller {
    finder: PocketFinder,
}

impl TerritoryFiller {
    /// Create a filler whose searches share `concurrency` permits.
    pub fn new(concurrency: usize, grid_cells: usize, max_pocket_cells: usize) -> Self {
        Self {
            finder: PocketFinder::new(concurrency, grid_cells, max_pocket_cells),
        }
    }

    /// Find and claim the pocket closed by `id`'s trail.
    ///
    /// Takes the read guard for seeding and searching and the write guard
    /// for the claim pass only.
    pub async fn fill(&self, world: Arc<RwLock<WorldState>>, id: PlayerId) -> FillOutcome {
        let seeds = {
            let state = world.read().await;
            match state.player(id) {
                Some(player) if player.alive && !player.trail.is_empty() => {}
                _ => return FillOutcome::Skipped,
            }
            trail_seeds(&state, id)
        };

        let seed_count = seeds.len();
        let pocket = if seeds.is_empty() {
            None
        } else {
            self.finder.find_first(Arc::clone(&world), id, seeds).await
        };

        let outcome = claim_pocket(&mut *world.write().await, id, pocket);
        match outcome {
            FillOutcome::Claimed {
                pocket,
                consolidated,
            } => info!(player_id = %id, seeds = seed_count, pocket, consolidated, "territory filled"),
            FillOutcome::Consolidated { consolidated } => {
                debug!(player_id = %id, seeds = seed_count, consolidated, "trail consolidated, no pocket");
            }
            FillOutcome::Skipped => debug!(player_id = %id, "fill skipped"),
        }
        outcome
    }
}

//! Enclosure ("pocket") search.
//!
//! When a trail closes back onto its owner's territory, the cells next to
//! the trail that the owner does not hold are seeds. A breadth-first search
//! from a seed that runs out of frontier without touching the wall has found
//! a sealed pocket; a search that reaches the wall (or grows past the size
//! bound) started in the open exterior.
//!
//! [`search_pocket`] runs one such search synchronously. [`PocketFinder`]
//! races many of them on blocking threads under a shared concurrency limit
//! and returns the first sealed pocket; the winner flips a shared flag that
//! every sibling polls once per expanded cell, so losers stop promptly.
//!
//! Searches only read the grid. Claiming the winning pocket is the
//! caller's job, under a write lock, after the finder has returned.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ouroboros_types::{CellPos, PlayerId};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::arena::{VisitArena, VisitLease};
use crate::grid::Grid;

/// How a single seed search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The frontier was exhausted without touching the wall. Holds every
    /// discovered cell, seed included.
    Enclosed(Vec<CellPos>),
    /// The search touched the wall, exceeded the size bound, or started on
    /// a cell that cannot be part of a pocket.
    Open,
    /// A sibling search already won.
    Cancelled,
}

/// Breadth-first search from `seed` over cells not owned by `owner`.
///
/// Cells owned by `owner` (territory or trail) bound the search. The
/// `cancel` flag is checked before each cell is expanded.
pub fn search_pocket(
    grid: &Grid,
    owner: PlayerId,
    seed: CellPos,
    visited: &mut VisitLease<'_>,
    cancel: &AtomicBool,
    max_cells: usize,
) -> SearchOutcome {
    if grid.is_wall(seed) || grid.owner(seed) == Some(owner) {
        return SearchOutcome::Open;
    }
    let Some(seed_index) = grid.index_of(seed) else {
        return SearchOutcome::Open;
    };
    visited.mark(seed_index);

    let mut discovered = vec![seed];
    let mut frontier = VecDeque::from([seed]);

    while let Some(pos) = frontier.pop_front() {
        if cancel.load(Ordering::Acquire) {
            return SearchOutcome::Cancelled;
        }

        for next in grid.neighbors(pos) {
            if grid.is_wall(next) {
                return SearchOutcome::Open;
            }
            if grid.owner(next) == Some(owner) {
                continue;
            }
            let Some(index) = grid.index_of(next) else {
                continue;
            };
            if !visited.mark(index) {
                continue;
            }
            if discovered.len() >= max_cells {
                return SearchOutcome::Open;
            }
            discovered.push(next);
            frontier.push_back(next);
        }
    }

    SearchOutcome::Enclosed(discovered)
}

/// Races seed searches and reports the first sealed pocket.
///
/// One finder is shared by every fill in the simulation, so its semaphore
/// is the global bound on concurrently running searches.
#[derive(Debug)]
pub struct PocketFinder {
    /// Concurrency limit shared by all fills.
    permits: Arc<Semaphore>,
    /// Visited-marker pool sized for the grid.
    arena: Arc<VisitArena>,
    /// Largest pocket still considered enclosed.
    max_cells: usize,
}

impl PocketFinder {
    /// Create a finder for grids of `grid_cells` cells running at most
    /// `concurrency` searches at once.
    pub fn new(concurrency: usize, grid_cells: usize, max_cells: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            arena: Arc::new(VisitArena::new(grid_cells)),
            max_cells: max_cells.max(1),
        }
    }

    /// Search every seed concurrently and return the cells of the first
    /// sealed pocket found, or `None` if every seed is open.
    ///
    /// Only one pocket is reported per call even if several are sealed:
    /// the first success cancels the remaining searches.
    pub async fn find_first<W>(
        &self,
        world: Arc<RwLock<W>>,
        owner: PlayerId,
        seeds: Vec<CellPos>,
    ) -> Option<Vec<CellPos>>
    where
        W: AsRef<Grid> + Send + Sync + 'static,
    {
        let found = Arc::new(AtomicBool::new(false));
        let mut searches = JoinSet::new();

        for seed in seeds {
            if found.load(Ordering::Acquire) {
                break;
            }
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                warn!("pocket search pool closed");
                break;
            };
            if found.load(Ordering::Acquire) {
                break;
            }

            let world = Arc::clone(&world);
            let arena = Arc::clone(&self.arena);
            let found = Arc::clone(&found);
            let max_cells = self.max_cells;

            searches.spawn_blocking(move || {
                let _permit = permit;
                let guard = world.blocking_read();
                let grid: &Grid = (*guard).as_ref();
                let mut visited = arena.lease();

                match search_pocket(grid, owner, seed, &mut visited, &found, max_cells) {
                    SearchOutcome::Enclosed(cells)
                        if found
                            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok() =>
                    {
                        Some(cells)
                    }
                    _ => None,
                }
            });
        }

        let mut winner = None;
        while let Some(joined) = searches.join_next().await {
            match joined {
                Ok(Some(cells)) => winner = Some(cells),
                Ok(None) => {}
                Err(e) => warn!(error = %e, player_id = %owner, "pocket search task failed"),
            }
        }

        debug!(
            player_id = %owner,
            pocket = winner.as_ref().map_or(0, Vec::len),
            "pocket search finished"
        );
        winner
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 7x7 grid (5x5 interior) with `me` holding a ring around (3, 3).
    fn ringed_grid(me: PlayerId) -> Grid {
        let mut grid = Grid::new(7, 7).unwrap();
        for (row, col) in [
            (2, 2),
            (2, 3),
            (2, 4),
            (3, 2),
            (3, 4),
            (4, 2),
            (4, 3),
            (4, 4),
        ] {
            grid.claim_territory(CellPos::new(row, col), me);
        }
        grid
    }

    #[test]
    fn sealed_cell_is_enclosed() {
        let me = PlayerId::new(1);
        let grid = ringed_grid(me);
        let arena = VisitArena::new(grid.len());
        let cancel = AtomicBool::new(false);

        let outcome = search_pocket(
            &grid,
            me,
            CellPos::new(3, 3),
            &mut arena.lease(),
            &cancel,
            100,
        );
        assert_eq!(outcome, SearchOutcome::Enclosed(vec![CellPos::new(3, 3)]));
    }

    #[test]
    fn exterior_seed_touches_wall() {
        let me = PlayerId::new(1);
        let grid = ringed_grid(me);
        let arena = VisitArena::new(grid.len());
        let cancel = AtomicBool::new(false);

        let outcome = search_pocket(
            &grid,
            me,
            CellPos::new(1, 3),
            &mut arena.lease(),
            &cancel,
            100,
        );
        assert_eq!(outcome, SearchOutcome::Open);
    }

    #[test]
    fn foreign_cells_do_not_bound_a_pocket() {
        let me = PlayerId::new(1);
        let them = PlayerId::new(2);
        let mut grid = ringed_grid(me);
        grid.claim_territory(CellPos::new(3, 3), them);
        let arena = VisitArena::new(grid.len());
        let cancel = AtomicBool::new(false);

        let outcome = search_pocket(
            &grid,
            me,
            CellPos::new(3, 3),
            &mut arena.lease(),
            &cancel,
            100,
        );
        assert_eq!(outcome, SearchOutcome::Enclosed(vec![CellPos::new(3, 3)]));
    }

    #[test]
    fn size_bound_turns_pocket_open() {
        let me = PlayerId::new(1);
        let mut grid = Grid::new(8, 8).unwrap();
        // Ring enclosing the 2x2 block (3..=4, 3..=4).
        for pos in grid.interior_positions().collect::<Vec<_>>() {
            let inside = (3..=4).contains(&pos.row) && (3..=4).contains(&pos.col);
            let ring = (2..=5).contains(&pos.row) && (2..=5).contains(&pos.col);
            if ring && !inside {
                grid.claim_territory(pos, me);
            }
        }
        let arena = VisitArena::new(grid.len());
        let cancel = AtomicBool::new(false);
        let seed = CellPos::new(3, 3);

        let bounded = search_pocket(&grid, me, seed, &mut arena.lease(), &cancel, 3);
        assert_eq!(bounded, SearchOutcome::Open);

        match search_pocket(&grid, me, seed, &mut arena.lease(), &cancel, 4) {
            SearchOutcome::Enclosed(cells) => assert_eq!(cells.len(), 4),
            other => panic!("expected enclosed pocket, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_search_stops() {
        let me = PlayerId::new(1);
        let grid = ringed_grid(me);
        let arena = VisitArena::new(grid.len());
        let cancel = AtomicBool::new(true);

        let outcome = search_pocket(
            &grid,
            me,
            CellPos::new(3, 3),
            &mut arena.lease(),
            &cancel,
            100,
        );
        assert_eq!(outcome, SearchOutcome::Cancelled);
    }

    #[tokio::test]
    async fn finder_returns_the_sealed_pocket() {
        let me = PlayerId::new(1);
        let grid = ringed_grid(me);
        let cells = grid.len();
        let world = Arc::new(RwLock::new(grid));
        let finder = PocketFinder::new(2, cells, 1000);

        let seeds = vec![CellPos::new(1, 2), CellPos::new(3, 3), CellPos::new(5, 5)];
        let pocket = finder.find_first(world, me, seeds).await;
        assert_eq!(pocket, Some(vec![CellPos::new(3, 3)]));
    }

    #[tokio::test]
    async fn finder_reports_nothing_for_open_seeds() {
        let me = PlayerId::new(1);
        let grid = ringed_grid(me);
        let cells = grid.len();
        let world = Arc::new(RwLock::new(grid));
        let finder = PocketFinder::new(4, cells, 1000);

        let seeds = vec![CellPos::new(1, 1), CellPos::new(5, 3)];
        assert_eq!(finder.find_first(world, me, seeds).await, None);
    }
}

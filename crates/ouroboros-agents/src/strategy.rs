//! Bot decision making.
//!
//! A [`Strategy`] maps `(player, world)` to the heading the player should
//! take on the next tick. It reads the world and nothing else, so the
//! simulation can evaluate every bot concurrently under one read guard.
//!
//! [`HeuristicStrategy`] is the built-in bot. It walks a strict priority
//! cascade and takes the first rule that yields a move:
//!
//! 1. **Attack** -- step onto an opponent's open trail.
//! 2. **Close the loop** -- step back into own territory once the trail is
//!    long enough, or immediately when threatened.
//! 3. **Flee** -- when threatened, maximize distance from the nearest
//!    opponent head.
//! 4. **Expand** -- head for the nearest own territory, preferring to keep
//!    going straight and avoiding drifting away from the center on long
//!    trails.
//!
//! Only legal moves are considered: no reversal, no wall, no cell holding
//! another living player's head. With no legal move the current heading is
//! kept.

use std::collections::{BTreeSet, VecDeque};

use ouroboros_types::{CellPos, Heading, PlayerId};

use crate::config::StrategyConfig;
use crate::player::Player;
use crate::state::WorldState;

/// Source of bot headings.
///
/// Implementations must be pure with respect to the world: they may not
/// keep per-tick state that depends on call order.
pub trait Strategy: Send + Sync + core::fmt::Debug {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Choose the heading for the next tick.
    fn next_heading(&self, player: &Player, world: &WorldState) -> Heading;
}

/// A candidate move that passed the legality filter.
#[derive(Debug, Clone, Copy)]
struct Move {
    heading: Heading,
    dest: CellPos,
}

/// Legal moves for `player`, in [`Heading::ALL`] order.
fn legal_moves(player: &Player, world: &WorldState) -> Vec<Move> {
    Heading::ALL
        .into_iter()
        .filter(|heading| !player.heading.is_reversed_by(*heading))
        .filter_map(|heading| {
            player
                .location
                .step(heading)
                .map(|dest| Move { heading, dest })
        })
        .filter(|mv| world.grid.is_interior(mv.dest))
        .filter(|mv| world.head_at(mv.dest, Some(player.id)).is_none())
        .collect()
}

/// The default rule-cascade bot.
#[derive(Debug, Clone, Default)]
pub struct HeuristicStrategy {
    config: StrategyConfig,
}

impl HeuristicStrategy {
    /// Create a bot with the given tunables.
    pub const fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Threat posed to `player`'s trail by nearby opponent heads.
    ///
    /// Each live opponent whose head lies within `threat_radius` of any
    /// trail cell adds `threat_weight * (radius + 1 - distance)`.
    pub fn threat_score(&self, player: &Player, world: &WorldState) -> u64 {
        if player.trail.len() < self.config.min_threat_trail {
            return 0;
        }
        let radius = self.config.threat_radius;

        world
            .live_players()
            .filter(|other| other.id != player.id)
            .filter_map(|other| {
                player
                    .trail
                    .iter()
                    .map(|cell| cell.manhattan(other.location))
                    .min()
            })
            .filter(|dist| *dist <= radius)
            .map(|dist| {
                let closeness = radius.saturating_add(1).saturating_sub(dist);
                u64::from(self.config.threat_weight)
                    .saturating_mul(u64::try_from(closeness).unwrap_or(u64::MAX))
            })
            .fold(0_u64, u64::saturating_add)
    }

    /// Nearest own territory cell within `search_depth` steps of `from`.
    fn nearest_territory(&self, id: PlayerId, from: CellPos, world: &WorldState) -> Option<CellPos> {
        let grid = &world.grid;
        let mut visited = BTreeSet::from([from]);
        let mut queue = VecDeque::from([(from, 0_usize)]);

        while let Some((pos, depth)) = queue.pop_front() {
            if grid.cell(pos).is_some_and(|cell| cell.is_territory_of(id)) {
                return Some(pos);
            }
            if depth >= self.config.search_depth {
                continue;
            }
            for next in grid.neighbors(pos) {
                if grid.is_interior(next) && visited.insert(next) {
                    queue.push_back((next, depth.saturating_add(1)));
                }
            }
        }
        None
    }

    fn nearest_opponent_head(player: &Player, world: &WorldState) -> Option<CellPos> {
        world
            .live_players()
            .filter(|other| other.id != player.id)
            .map(|other| other.location)
            .min_by_key(|head| head.manhattan(player.location))
    }

    fn attack(player: &Player, world: &WorldState, moves: &[Move]) -> Option<Heading> {
        moves
            .iter()
            .find(|mv| {
                world.grid.cell(mv.dest).is_some_and(|cell| {
                    cell.is_foreign_trail(player.id)
                        && cell.owner.is_some_and(|owner| world.is_alive(owner))
                })
            })
            .map(|mv| mv.heading)
    }

    fn close_loop(
        &self,
        player: &Player,
        world: &WorldState,
        moves: &[Move],
        threatened: bool,
    ) -> Option<Heading> {
        if player.trail.is_empty() {
            return None;
        }
        if player.trail.len() < self.config.min_loop_trail && !threatened {
            return None;
        }
        moves
            .iter()
            .find(|mv| {
                world
                    .grid
                    .cell(mv.dest)
                    .is_some_and(|cell| cell.is_territory_of(player.id))
            })
            .map(|mv| mv.heading)
    }

    fn flee(&self, player: &Player, world: &WorldState, moves: &[Move]) -> Heading {
        let Some(threat) = Self::nearest_opponent_head(player, world) else {
            return self.expand(player, world, moves);
        };
        let home = self.nearest_territory(player.id, player.location, world);

        moves
            .iter()
            .max_by_key(|mv| {
                let away = mv.dest.manhattan(threat);
                let to_home = home.map_or(usize::MAX, |h| mv.dest.manhattan(h));
                (away, core::cmp::Reverse(to_home))
            })
            .map_or(player.heading, |mv| mv.heading)
    }

    fn expand(&self, player: &Player, world: &WorldState, moves: &[Move]) -> Heading {
        let home = self.nearest_territory(player.id, player.location, world);
        let center = world.grid.center();
        let long_trail = player.trail.len() > self.config.center_trail_threshold;
        let here_to_center = player.location.manhattan(center);

        let score = |mv: &Move| -> i64 {
            let mut score = home.map_or(i64::from(i32::MAX), |h| {
                i64::try_from(mv.dest.manhattan(h)).unwrap_or(i64::MAX)
            });
            if mv.heading == player.heading {
                score = score.saturating_sub(self.config.straight_bias);
            }
            if long_trail && mv.dest.manhattan(center) > here_to_center {
                score = score.saturating_add(self.config.center_penalty);
            }
            score
        };

        // min_by_key keeps the first of equal minima, so ties follow ALL order.
        moves
            .iter()
            .min_by_key(|mv| score(mv))
            .map_or(player.heading, |mv| mv.heading)
    }
}

impl Strategy for HeuristicStrategy {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn next_heading(&self, player: &Player, world: &WorldState) -> Heading {
        let moves = legal_moves(player, world);
        if moves.is_empty() {
            return player.heading;
        }

        if let Some(heading) = Self::attack(player, world, &moves) {
            return heading;
        }

        let threatened = self.threat_score(player, world) > 0;
        if let Some(heading) = self.close_loop(player, world, &moves, threatened) {
            return heading;
        }

        if threatened {
            return self.flee(player, world, &moves);
        }

        self.expand(player, world, &moves)
    }
}

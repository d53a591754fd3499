//! Tick resolution: the movement and collision state machine.
//!
//! [`resolve_tick`] runs under the world write guard and performs the
//! synchronous part of one tick:
//!
//! 1. **Turn** -- apply the latest pending heading per player, silently
//!    rejecting reversals.
//! 2. **Move** -- advance every live player one cell (slow-motion players
//!    skip ticks) and resolve the destination:
//!    - wall: the mover dies;
//!    - another living, non-safe player's cell:
//!      - their head: both die and both score a kill;
//!      - their trail: they die, the mover scores and takes the cell;
//!      - their territory: the mover takes the cell as trail;
//!    - a dead or safe player's cell: the move is blocked this tick;
//!    - own cell with an open trail: the loop is closed and a fill is due;
//!    - own cell otherwise: the mover walks in;
//!    - unclaimed: the mover lays trail.
//!
//! Deaths and fills are only reported here. The simulation enqueues
//! sunsets and runs fills after the write guard is released; fills finish
//! before the next tick starts.
//!
//! Players are processed in identifier order. Death is idempotent, so a
//! player cut by one opponent and hit head-on by another in the same tick
//! dies once and is reported once.

use std::collections::BTreeMap;
use std::sync::Arc;

use ouroboros_agents::{Strategy, WorldState};
use ouroboros_types::{CellPos, Heading, PlayerId};
use tracing::debug;

/// Counters describing one resolved tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Living players at the end of the tick.
    pub live_players: usize,
    /// Players that changed cell.
    pub moves: usize,
    /// Players that died this tick.
    pub deaths: usize,
    /// Loops closed (fills scheduled).
    pub fills: usize,
    /// Moves blocked by a dead or safe owner.
    pub blocked: usize,
    /// Heading changes rejected as reversals.
    pub rejected_turns: usize,
}

/// Everything the simulation must act on after a tick.
#[derive(Debug, Default)]
pub struct TickResolution {
    /// Counters for logging.
    pub summary: TickSummary,
    /// Players that died this tick, each listed once.
    pub deaths: Vec<PlayerId>,
    /// Players whose trail closed a loop this tick.
    pub fills: Vec<PlayerId>,
    /// Live bots and their strategies, for next tick's decisions.
    pub bots: Vec<(PlayerId, Arc<dyn Strategy>)>,
}

/// How a single move ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveOutcome {
    /// The player did not move this tick (slow motion).
    Idle,
    /// The player moved to a new cell.
    Moved,
    /// The player moved and closed a loop.
    ClosedLoop,
    /// The destination's owner is dead or safe.
    Blocked,
    /// The move killed one or more players (possibly the mover).
    Fatal,
}

/// Mark `id` dead; record it if this call killed it.
fn kill(state: &mut WorldState, id: PlayerId, deaths: &mut Vec<PlayerId>) {
    if state.player_mut(id).is_some_and(ouroboros_agents::Player::kill) {
        deaths.push(id);
    }
}

fn credit_kill(state: &mut WorldState, id: PlayerId) {
    if let Some(player) = state.player_mut(id) {
        player.add_kill();
    }
}

/// Lay trail for `id` on `dest` and move its head there.
fn advance_onto_trail(state: &mut WorldState, id: PlayerId, dest: CellPos, heading: Heading) {
    state.grid.lay_trail(dest, id, heading);
    if let Some(player) = state.player_mut(id) {
        player.trail.push(dest);
        player.location = dest;
        player.safe = false;
    }
}

/// Resolve one player's move against the grid.
fn move_player(state: &mut WorldState, id: PlayerId, deaths: &mut Vec<PlayerId>) -> MoveOutcome {
    let Some(player) = state.player_mut(id) else {
        return MoveOutcome::Idle;
    };
    if !player.alive || !player.ready_to_move() {
        return MoveOutcome::Idle;
    }
    let heading = player.heading;
    let from = player.location;

    let dest = match from.step(heading) {
        Some(dest) if !state.grid.is_wall(dest) => dest,
        _ => {
            debug!(player_id = %id, from = %from, "hit the wall");
            kill(state, id, deaths);
            return MoveOutcome::Fatal;
        }
    };

    let Some(cell) = state.grid.cell(dest).cloned() else {
        kill(state, id, deaths);
        return MoveOutcome::Fatal;
    };

    match cell.owner {
        Some(owner) if owner != id => {
            let Some(victim) = state.player(owner) else {
                return MoveOutcome::Blocked;
            };
            if !victim.alive || victim.safe {
                return MoveOutcome::Blocked;
            }

            if victim.location == dest {
                debug!(player_id = %id, other = %owner, at = %dest, "head-on collision");
                kill(state, id, deaths);
                kill(state, owner, deaths);
                credit_kill(state, id);
                credit_kill(state, owner);
                return MoveOutcome::Fatal;
            }

            if cell.is_trail {
                debug!(player_id = %id, victim = %owner, at = %dest, "trail cut");
                kill(state, owner, deaths);
                credit_kill(state, id);
                if let Some(victim) = state.player_mut(owner) {
                    victim.remove_from_trail(dest);
                }
                advance_onto_trail(state, id, dest, heading);
                return MoveOutcome::Fatal;
            }

            advance_onto_trail(state, id, dest, heading);
            MoveOutcome::Moved
        }
        Some(_) => {
            let Some(player) = state.player_mut(id) else {
                return MoveOutcome::Idle;
            };
            player.location = dest;
            if player.trail.is_empty() {
                player.safe = !cell.is_trail;
                MoveOutcome::Moved
            } else {
                player.safe = true;
                MoveOutcome::ClosedLoop
            }
        }
        None => {
            advance_onto_trail(state, id, dest, heading);
            MoveOutcome::Moved
        }
    }
}

/// Resolve one tick in place.
///
/// `pending` holds at most one requested heading per player (the latest
/// received). Requests for unknown or dead players are ignored.
pub fn resolve_tick(
    state: &mut WorldState,
    tick: u64,
    pending: &BTreeMap<PlayerId, Heading>,
) -> TickResolution {
    let mut resolution = TickResolution::default();
    resolution.summary.tick = tick;

    for (id, heading) in pending {
        if let Some(player) = state.player_mut(*id).filter(|p| p.alive) {
            if !player.turn(*heading) {
                resolution.summary.rejected_turns = resolution.summary.rejected_turns.saturating_add(1);
            }
        }
    }

    let movers: Vec<PlayerId> = state.live_players().map(|p| p.id).collect();
    for id in movers {
        match move_player(state, id, &mut resolution.deaths) {
            MoveOutcome::Idle => {}
            MoveOutcome::Moved => {
                resolution.summary.moves = resolution.summary.moves.saturating_add(1);
            }
            MoveOutcome::ClosedLoop => {
                resolution.summary.moves = resolution.summary.moves.saturating_add(1);
                resolution.fills.push(id);
            }
            MoveOutcome::Blocked => {
                resolution.summary.blocked = resolution.summary.blocked.saturating_add(1);
            }
            MoveOutcome::Fatal => {
                if state.is_alive(id) {
                    resolution.summary.moves = resolution.summary.moves.saturating_add(1);
                }
            }
        }
    }

    // A loop closed by a player who was killed later in the same tick
    // is not filled.
    resolution.fills.retain(|id| state.is_alive(*id));

    resolution.bots = state
        .live_players()
        .filter_map(|p| p.strategy.as_ref().map(|s| (p.id, Arc::clone(s))))
        .collect();

    resolution.summary.deaths = resolution.deaths.len();
    resolution.summary.fills = resolution.fills.len();
    resolution.summary.live_players = state.live_players().count();
    resolution
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ouroboros_agents::Player;
    use ouroboros_world::Grid;

    use super::*;

    const A: PlayerId = PlayerId(1);
    const B: PlayerId = PlayerId(2);

    fn world(rows: usize, cols: usize) -> WorldState {
        WorldState::new(Grid::new(rows, cols).unwrap(), Some(1))
    }

    /// Put a player on `at` without any territory.
    fn drop_in(state: &mut WorldState, id: PlayerId, at: CellPos, heading: Heading) {
        let mut player = Player::new(id, format!("p{id}"), at, heading, None);
        player.safe = false;
        state.players.insert(id, player);
    }

    fn home(state: &mut WorldState, id: PlayerId, cells: &[CellPos]) {
        for pos in cells {
            state.grid.claim_territory(*pos, id);
            state.player_mut(id).unwrap().claimed.insert(*pos);
        }
    }

    fn no_turns() -> BTreeMap<PlayerId, Heading> {
        BTreeMap::new()
    }

    #[test]
    fn moving_into_the_wall_kills() {
        let mut state = world(5, 5);
        drop_in(&mut state, A, CellPos::new(1, 2), Heading::Up);

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert_eq!(res.deaths, vec![A]);
        assert_eq!(res.summary.live_players, 0);
        assert!(!state.is_alive(A));
    }

    #[test]
    fn head_on_kills_both_and_credits_both() {
        let mut state = world(7, 7);
        drop_in(&mut state, A, CellPos::new(3, 1), Heading::Right);
        drop_in(&mut state, B, CellPos::new(3, 3), Heading::Left);

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert_eq!(res.deaths, vec![B, A]);
        for id in [A, B] {
            let p = state.player(id).unwrap();
            assert!(!p.alive);
            assert_eq!(p.kills, 1);
        }
    }

    #[test]
    fn cutting_a_trail_kills_its_owner() {
        let mut state = world(9, 9);
        drop_in(&mut state, A, CellPos::new(4, 2), Heading::Right);
        drop_in(&mut state, B, CellPos::new(5, 3), Heading::Down);
        // B's trail runs up through (4, 3).
        state.grid.lay_trail(CellPos::new(4, 3), B, Heading::Down);
        state.grid.lay_trail(CellPos::new(5, 3), B, Heading::Down);
        state.player_mut(B).unwrap().trail = vec![CellPos::new(4, 3), CellPos::new(5, 3)];

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert_eq!(res.deaths, vec![B]);

        let a = state.player(A).unwrap();
        assert!(a.alive);
        assert_eq!(a.kills, 1);
        assert_eq!(a.location, CellPos::new(4, 3));
        assert_eq!(a.trail, vec![CellPos::new(4, 3)]);
        let cell = state.grid.cell(CellPos::new(4, 3)).unwrap();
        assert_eq!(cell.owner, Some(A));
        assert!(cell.is_trail);
        assert_eq!(state.player(B).unwrap().trail, vec![CellPos::new(5, 3)]);
    }

    /// B's trail runs from (4, 3) down to its head on (5, 3).
    fn exposed_victim(state: &mut WorldState) {
        drop_in(state, B, CellPos::new(5, 3), Heading::Down);
        state.grid.lay_trail(CellPos::new(4, 3), B, Heading::Down);
        state.grid.lay_trail(CellPos::new(5, 3), B, Heading::Down);
        state.player_mut(B).unwrap().trail = vec![CellPos::new(4, 3), CellPos::new(5, 3)];
        // Keep B still.
        state.player_mut(B).unwrap().speed = -100;
    }

    #[test]
    fn cut_and_head_on_in_one_tick_kill_once() {
        const C: PlayerId = PlayerId(3);

        // A cuts the trail first, then C runs into the already dead head.
        let mut state = world(9, 9);
        exposed_victim(&mut state);
        drop_in(&mut state, A, CellPos::new(4, 2), Heading::Right);
        drop_in(&mut state, C, CellPos::new(5, 4), Heading::Left);

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert_eq!(res.deaths, vec![B]);
        assert_eq!(res.summary.deaths, 1);
        assert_eq!(res.summary.blocked, 1);
        assert_eq!(state.player(A).unwrap().kills, 1);
        assert_eq!(state.player(C).unwrap().kills, 0);

        // A hits the head first, then C finds the trail owner already dead.
        let mut state = world(9, 9);
        exposed_victim(&mut state);
        drop_in(&mut state, A, CellPos::new(5, 4), Heading::Left);
        drop_in(&mut state, C, CellPos::new(4, 2), Heading::Right);

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert_eq!(res.deaths, vec![A, B]);
        assert_eq!(res.deaths.iter().filter(|id| **id == B).count(), 1);
        assert_eq!(res.summary.blocked, 1);
        assert!(state.is_alive(C));
        assert_eq!(state.player(C).unwrap().kills, 0);
    }

    #[test]
    fn reversal_requests_are_ignored() {
        let mut state = world(9, 9);
        drop_in(&mut state, A, CellPos::new(4, 4), Heading::Right);

        let turns = BTreeMap::from([(A, Heading::Left)]);
        let res = resolve_tick(&mut state, 1, &turns);
        assert_eq!(res.summary.rejected_turns, 1);
        let a = state.player(A).unwrap();
        assert_eq!(a.heading, Heading::Right);
        assert_eq!(a.location, CellPos::new(4, 5));

        let turns = BTreeMap::from([(A, Heading::Down)]);
        resolve_tick(&mut state, 2, &turns);
        assert_eq!(state.player(A).unwrap().location, CellPos::new(5, 5));
    }

    #[test]
    fn returning_home_with_a_trail_closes_the_loop() {
        let mut state = world(9, 9);
        drop_in(&mut state, A, CellPos::new(3, 4), Heading::Up);
        home(&mut state, A, &[CellPos::new(2, 4)]);
        state.grid.lay_trail(CellPos::new(3, 4), A, Heading::Up);
        state.player_mut(A).unwrap().trail = vec![CellPos::new(3, 4)];

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert_eq!(res.fills, vec![A]);
        let a = state.player(A).unwrap();
        assert!(a.safe);
        assert_eq!(a.location, CellPos::new(2, 4));
        // The fill, not the tick, clears the trail.
        assert_eq!(a.trail.len(), 1);
    }

    #[test]
    fn walking_inside_own_territory_is_safe() {
        let mut state = world(9, 9);
        drop_in(&mut state, A, CellPos::new(4, 4), Heading::Right);
        home(&mut state, A, &[CellPos::new(4, 4), CellPos::new(4, 5)]);

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert!(res.fills.is_empty());
        let a = state.player(A).unwrap();
        assert!(a.safe);
        assert!(a.trail.is_empty());

        // Leaving lays trail and drops safety.
        resolve_tick(&mut state, 2, &no_turns());
        let a = state.player(A).unwrap();
        assert!(!a.safe);
        assert_eq!(a.trail, vec![CellPos::new(4, 6)]);
    }

    #[test]
    fn safe_and_dead_owners_block_moves() {
        let mut state = world(9, 9);
        drop_in(&mut state, A, CellPos::new(4, 2), Heading::Right);
        drop_in(&mut state, B, CellPos::new(1, 7), Heading::Down);
        home(&mut state, B, &[CellPos::new(4, 3)]);
        state.player_mut(B).unwrap().safe = true;
        // Keep B still.
        state.player_mut(B).unwrap().speed = -100;

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert_eq!(res.summary.blocked, 1);
        assert_eq!(state.player(A).unwrap().location, CellPos::new(4, 2));

        state.player_mut(B).unwrap().safe = false;
        state.player_mut(B).unwrap().kill();
        let res = resolve_tick(&mut state, 2, &no_turns());
        assert_eq!(res.summary.blocked, 1);
        assert_eq!(state.grid.owner(CellPos::new(4, 3)), Some(B));
    }

    #[test]
    fn foreign_territory_is_captured_as_trail() {
        let mut state = world(9, 9);
        drop_in(&mut state, A, CellPos::new(4, 2), Heading::Right);
        drop_in(&mut state, B, CellPos::new(1, 7), Heading::Down);
        home(&mut state, B, &[CellPos::new(4, 3)]);
        state.player_mut(B).unwrap().speed = -100;

        let res = resolve_tick(&mut state, 1, &no_turns());
        assert!(res.deaths.is_empty());
        let cell = state.grid.cell(CellPos::new(4, 3)).unwrap();
        assert_eq!(cell.owner, Some(A));
        assert!(cell.is_trail);
        assert!(state.is_alive(B));
    }

    #[test]
    fn slow_players_skip_ticks() {
        let mut state = world(15, 15);
        drop_in(&mut state, A, CellPos::new(7, 2), Heading::Right);
        state.player_mut(A).unwrap().speed = -1;

        for tick in 1..=4 {
            resolve_tick(&mut state, tick, &no_turns());
        }
        // Moves on ticks 2 and 4.
        assert_eq!(state.player(A).unwrap().location, CellPos::new(7, 4));
    }

    #[test]
    fn bots_are_listed_for_decisions() {
        let mut state = world(9, 9);
        let strategy: Arc<dyn Strategy> = Arc::new(ouroboros_agents::HeuristicStrategy::default());
        drop_in(&mut state, A, CellPos::new(4, 4), Heading::Up);
        state.player_mut(A).unwrap().strategy = Some(strategy);
        drop_in(&mut state, B, CellPos::new(6, 6), Heading::Up);

        let res = resolve_tick(&mut state, 1, &no_turns());
        let bots: Vec<PlayerId> = res.bots.iter().map(|(id, _)| *id).collect();
        assert_eq!(bots, vec![A]);
    }
}

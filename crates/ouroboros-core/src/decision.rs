//! Bot decision collection.
//!
//! After a tick resolves, every living bot is asked for its next heading.
//! Each request runs on the blocking pool against a read guard of the
//! post-tick world. Before the next tick the batch is gathered, and the
//! tick does not start until every request has settled. A batch that runs
//! past its budget is logged as an overrun.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ouroboros_agents::{Strategy, WorldState};
use ouroboros_types::{Heading, PlayerId};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outstanding decision requests for one tick.
#[derive(Debug)]
pub struct DecisionBatch {
    tasks: JoinSet<Option<(PlayerId, Heading)>>,
    budget_ends: Instant,
}

impl DecisionBatch {
    /// Start one decision task per bot. `budget` is the time the whole
    /// batch is expected to settle in.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn scatter(
        world: &Arc<RwLock<WorldState>>,
        bots: Vec<(PlayerId, Arc<dyn Strategy>)>,
        budget: Duration,
    ) -> Self {
        let mut tasks = JoinSet::new();
        for (id, strategy) in bots {
            let world = Arc::clone(world);
            tasks.spawn_blocking(move || {
                let state = world.blocking_read();
                let player = state.player(id).filter(|p| p.alive)?;
                Some((id, strategy.next_heading(player, &state)))
            });
        }
        Self {
            tasks,
            budget_ends: Instant::now().checked_add(budget).unwrap_or_else(Instant::now),
        }
    }

    /// Wait for every decision in the batch.
    ///
    /// Bots that died or left before their task ran yield nothing. Passing
    /// the budget is reported once and the wait continues.
    pub async fn gather(mut self) -> BTreeMap<PlayerId, Heading> {
        let mut decisions = BTreeMap::new();
        let mut overrun = false;
        loop {
            let next = if overrun {
                self.tasks.join_next().await
            } else {
                match tokio::time::timeout_at(self.budget_ends, self.tasks.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(outstanding = self.tasks.len(), "bot decisions overran their budget");
                        overrun = true;
                        continue;
                    }
                }
            };
            match next {
                Some(Ok(Some((id, heading)))) => {
                    decisions.insert(id, heading);
                }
                Some(Ok(None)) => {}
                Some(Err(e)) => warn!(error = %e, "decision task failed"),
                None => break,
            }
        }
        debug!(decisions = decisions.len(), overrun, "decision batch settled");
        decisions
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ouroboros_agents::Player;
    use ouroboros_types::CellPos;
    use ouroboros_world::Grid;

    use super::*;

    #[derive(Debug)]
    struct Fixed(Heading);

    impl Strategy for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn next_heading(&self, _player: &Player, _state: &WorldState) -> Heading {
            self.0
        }
    }

    #[derive(Debug)]
    struct Sluggish(AtomicUsize);

    impl Strategy for Sluggish {
        fn name(&self) -> &str {
            "sluggish"
        }

        fn next_heading(&self, _player: &Player, _state: &WorldState) -> Heading {
            self.0.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            Heading::Right
        }
    }

    fn world_with(ids: &[u16]) -> Arc<RwLock<WorldState>> {
        let mut state = WorldState::new(Grid::new(12, 12).unwrap(), Some(1));
        for (i, raw) in ids.iter().enumerate() {
            let id = PlayerId::new(*raw);
            let pos = CellPos::new(2_usize.saturating_add(i.saturating_mul(3)), 3);
            state.players.insert(id, Player::new(id, format!("p{raw}"), pos, Heading::Up, None));
        }
        Arc::new(RwLock::new(state))
    }

    #[tokio::test]
    async fn answers_are_collected_per_bot() {
        let world = world_with(&[1, 2]);
        let bots: Vec<(PlayerId, Arc<dyn Strategy>)> = vec![
            (PlayerId::new(1), Arc::new(Fixed(Heading::Left))),
            (PlayerId::new(2), Arc::new(Fixed(Heading::Right))),
        ];

        let decisions = DecisionBatch::scatter(&world, bots, Duration::from_secs(2))
            .gather()
            .await;

        assert_eq!(decisions.get(&PlayerId::new(1)), Some(&Heading::Left));
        assert_eq!(decisions.get(&PlayerId::new(2)), Some(&Heading::Right));
    }

    #[tokio::test]
    async fn dead_or_missing_bots_are_skipped() {
        let world = world_with(&[1]);
        world.write().await.player_mut(PlayerId::new(1)).unwrap().kill();
        let bots: Vec<(PlayerId, Arc<dyn Strategy>)> = vec![
            (PlayerId::new(1), Arc::new(Fixed(Heading::Left))),
            (PlayerId::new(9), Arc::new(Fixed(Heading::Left))),
        ];

        let decisions = DecisionBatch::scatter(&world, bots, Duration::from_secs(2))
            .gather()
            .await;
        assert!(decisions.is_empty());
    }

    #[tokio::test]
    async fn gather_waits_for_answers_past_the_budget() {
        let world = world_with(&[1, 2]);
        let slow = Arc::new(Sluggish(AtomicUsize::new(0)));
        let bots: Vec<(PlayerId, Arc<dyn Strategy>)> = vec![
            (PlayerId::new(1), Arc::new(Fixed(Heading::Left))),
            (PlayerId::new(2), Arc::clone(&slow) as Arc<dyn Strategy>),
        ];

        let started = std::time::Instant::now();
        let decisions = DecisionBatch::scatter(&world, bots, Duration::from_millis(50))
            .gather()
            .await;

        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(slow.0.load(Ordering::SeqCst), 1);
        assert_eq!(decisions.get(&PlayerId::new(1)), Some(&Heading::Left));
        assert_eq!(decisions.get(&PlayerId::new(2)), Some(&Heading::Right));
    }
}

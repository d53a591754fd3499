//! The simulation context.
//!
//! A [`Simulation`] owns the shared world, the tick driver, the fill and
//! decision tasks, the event hub and the lifecycle pools. It is the only
//! surface collaborators (session handlers, renderers, the headless
//! engine) talk to:
//!
//! - [`join`](Simulation::join) a human player under a color identifier
//! - [`submit_heading`](Simulation::submit_heading) for the next tick
//! - [`subscribe`](Simulation::subscribe) to a player's event stream
//! - [`snapshot_region`](Simulation::snapshot_region) for a viewport
//! - [`start`](Simulation::start) / [`stop`](Simulation::stop) the driver
//!
//! # Tick phases
//!
//! Each tick runs these phases in order:
//!
//! 1. **Barrier** -- wait for the previous tick's fills and for every bot
//!    decision scattered after it.
//! 2. **Intake** -- drain queued human headings (the latest per player
//!    wins and overrides any bot decision for that player).
//! 3. **Resolve** -- turn, move and collide under the world write guard.
//! 4. **Dispatch** -- queue sunsets for the dead, start fills for closed
//!    loops, scatter decisions for the next tick, notify subscribers.

use std::collections::BTreeMap;
use std::future::Future;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ouroboros_agents::{
    AgentError, FillOutcome, HeuristicStrategy, Player, Strategy, TerritoryFiller, WorldState,
    place_player, spawn_available, sunset_player,
};
use ouroboros_types::{Cell, Heading, HeadingRequest, PlayerEvent, PlayerId};
use ouroboros_world::{Grid, WorldError};
use tokio::sync::{RwLock, RwLockReadGuard, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SimulationConfig};
use crate::control::ControlState;
use crate::decision::DecisionBatch;
use crate::events::EventHub;
use crate::lifecycle::{LifecycleContext, LifecyclePools, SunsetRequest, announce_death};
use crate::names::bot_name;
use crate::runner::{RunResult, TickStepper, log_run_end, run_simulation};
use crate::score::ScoreSink;
use crate::tick::{TickSummary, resolve_tick};

/// Errors surfaced by the simulation API.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The configuration cannot drive a simulation.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The grid could not be allocated.
    #[error("world error: {source}")]
    World {
        /// The underlying grid error.
        #[from]
        source: WorldError,
    },

    /// A player could not be placed.
    #[error("player error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// The identifier is reserved or out of range.
    #[error("identifier {player_id} cannot be assigned to a player")]
    UnassignableIdentifier {
        /// The rejected identifier.
        player_id: PlayerId,
    },

    /// No player is registered under the identifier.
    #[error("player not found: {player_id}")]
    PlayerNotFound {
        /// The missing identifier.
        player_id: PlayerId,
    },

    /// [`Simulation::start`] was already called.
    #[error("simulation already started")]
    AlreadyStarted,

    /// [`Simulation::stop`] was called without a running driver.
    #[error("simulation not started")]
    NotStarted,

    /// The driver task panicked or was cancelled.
    #[error("tick driver failed: {source}")]
    Driver {
        /// The join failure.
        #[from]
        source: JoinError,
    },
}

/// One row of the standings table.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    /// The player.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Territory cells currently owned.
    pub claimed_cells: usize,
    /// `claimed_cells` as a percentage of the playable area.
    pub claimed_percentage: f64,
    /// Kills credited so far.
    pub kills: u32,
    /// Whether a strategy drives the player.
    pub is_bot: bool,
}

/// Background work started by one tick and awaited by the next.
#[derive(Debug, Default)]
struct InFlight {
    fills: JoinSet<FillOutcome>,
    decisions: Option<DecisionBatch>,
    ready: BTreeMap<PlayerId, Heading>,
}

#[derive(Debug)]
struct Shared {
    config: SimulationConfig,
    world: Arc<RwLock<WorldState>>,
    filler: Arc<TerritoryFiller>,
    events: Arc<EventHub>,
    sink: Arc<dyn ScoreSink>,
    strategy: Arc<dyn Strategy>,
    lifecycle: LifecyclePools,
    control: ControlState,
    headings_tx: mpsc::Sender<HeadingRequest>,
    headings_rx: tokio::sync::Mutex<mpsc::Receiver<HeadingRequest>>,
    tick: AtomicU64,
    in_flight: tokio::sync::Mutex<InFlight>,
}

/// A running (or runnable) territory simulation.
#[derive(Debug)]
pub struct Simulation {
    shared: Arc<Shared>,
    started: AtomicBool,
    driver: Mutex<Option<JoinHandle<RunResult>>>,
}

impl Simulation {
    /// Build the world and start the lifecycle pools. The tick driver does
    /// not run until [`start`](Self::start).
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] for an invalid configuration or
    /// [`SimulationError::World`] if the grid cannot be allocated.
    pub fn new(config: SimulationConfig, sink: Arc<dyn ScoreSink>) -> Result<Self, SimulationError> {
        config.validate()?;

        let grid = Grid::new(config.world.rows, config.world.cols)?;
        let grid_cells = grid.len();
        let world = Arc::new(RwLock::new(WorldState::new(grid, config.world.seed)));
        let events = Arc::new(EventHub::new(
            config.players.event_queue,
            Duration::from_millis(config.players.death_notice_timeout_ms),
        ));
        let strategy: Arc<dyn Strategy> =
            Arc::new(HeuristicStrategy::new(config.bots.strategy_config()));
        let filler = Arc::new(TerritoryFiller::new(
            config.workers.fill_concurrency,
            grid_cells,
            config.workers.max_pocket_cells,
        ));
        let lifecycle = LifecyclePools::start(
            LifecycleContext {
                world: Arc::clone(&world),
                events: Arc::clone(&events),
                sink: Arc::clone(&sink),
                spawn: config.players.spawn_config(),
                strategy: Arc::clone(&strategy),
            },
            &config.workers,
        );
        let (headings_tx, headings_rx) = mpsc::channel(config.players.heading_queue);
        let control = ControlState::new(config.world.tick_interval_ms, config.world.max_ticks);

        info!(
            rows = config.world.rows,
            cols = config.world.cols,
            tick_interval_ms = config.world.tick_interval_ms,
            seed = ?config.world.seed,
            "simulation created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                world,
                filler,
                events,
                sink,
                strategy,
                lifecycle,
                control,
                headings_tx,
                headings_rx: tokio::sync::Mutex::new(headings_rx),
                tick: AtomicU64::new(0),
                in_flight: tokio::sync::Mutex::new(InFlight::default()),
            }),
            started: AtomicBool::new(false),
            driver: Mutex::new(None),
        })
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Register a human player under `player_id`.
    ///
    /// A player already holding the identifier, dead or alive, is sunset
    /// first and receives its death notice before this returns. If no
    /// spawn cell would be left, the occupant is kept.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnassignableIdentifier`] for a reserved
    /// or out-of-range identifier, or [`SimulationError::Agent`] when no
    /// spawn cell is left.
    pub async fn join(
        &self,
        name: impl Into<String>,
        player_id: PlayerId,
    ) -> Result<Player, SimulationError> {
        let shared = &self.shared;
        if !shared.config.players.is_assignable(player_id) {
            return Err(SimulationError::UnassignableIdentifier { player_id });
        }

        let spawn = shared.config.players.spawn_config();
        let (previous, placed) = {
            let mut state = shared.world.write().await;
            // The occupant stays put unless the newcomer can be placed.
            if !spawn_available(&state.grid, player_id) {
                return Err(AgentError::NoSpawnCell { player_id }.into());
            }
            let previous = sunset_player(&mut state, player_id);
            let placed = place_player(&mut state, &spawn, player_id, name.into(), None).cloned();
            (previous, placed)
        };

        if let Some(report) = previous {
            debug!(player_id = %player_id, "previous occupant replaced");
            announce_death(&shared.events, shared.sink.as_ref(), report).await;
        }

        let player = placed?;
        info!(player_id = %player_id, name = %player.name, at = %player.location, "player joined");
        Ok(player)
    }

    /// Queue a heading change for the next tick.
    ///
    /// Reversals are accepted here and rejected when applied. Returns
    /// `false` if the intake queue is full.
    pub fn submit_heading(&self, player_id: PlayerId, heading: Heading) -> bool {
        let request = HeadingRequest { player_id, heading };
        match self.shared.headings_tx.try_send(request) {
            Ok(()) => true,
            Err(e) => {
                debug!(player_id = %player_id, error = %e, "heading request dropped");
                false
            }
        }
    }

    /// Open the event stream of a registered player, replacing any
    /// previous stream for it.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::PlayerNotFound`] if nothing is registered
    /// under `player_id`.
    pub async fn subscribe(
        &self,
        player_id: PlayerId,
    ) -> Result<mpsc::Receiver<PlayerEvent>, SimulationError> {
        let state = self.shared.world.read().await;
        if state.player(player_id).is_none() {
            return Err(SimulationError::PlayerNotFound { player_id });
        }
        // Subscribing under the read guard keeps a concurrent sunset from
        // slipping in between the check and the registration.
        Ok(self.shared.events.subscribe(player_id))
    }

    /// Hand control of a live player to `strategy`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::PlayerNotFound`] if `player_id` is not
    /// registered or already dead.
    pub async fn set_strategy(
        &self,
        player_id: PlayerId,
        strategy: Arc<dyn Strategy>,
    ) -> Result<(), SimulationError> {
        let mut state = self.shared.world.write().await;
        let player = state
            .player_mut(player_id)
            .filter(|p| p.alive)
            .ok_or(SimulationError::PlayerNotFound { player_id })?;
        debug!(player_id = %player_id, strategy = strategy.name(), "strategy replaced");
        player.strategy = Some(strategy);
        Ok(())
    }

    /// Place bots under the lowest free assignable identifiers until
    /// `bots.count` slots are filled or the identifier space runs out.
    ///
    /// Returns the number of bots placed.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Agent`] when the grid has no spawn cell
    /// left for the first bot that needs one.
    pub async fn populate_bots(&self) -> Result<usize, SimulationError> {
        let shared = &self.shared;
        let wanted = usize::from(shared.config.bots.count);
        let spawn = shared.config.players.spawn_config();
        let mut state = shared.world.write().await;

        let mut placed = 0_usize;
        for raw in 0..=shared.config.players.max_identifier {
            if placed >= wanted {
                break;
            }
            let id = PlayerId::new(raw);
            if !shared.config.players.is_assignable(id) || state.players.contains_key(&id) {
                continue;
            }
            place_player(&mut state, &spawn, id, bot_name(id), Some(Arc::clone(&shared.strategy)))?;
            placed = placed.saturating_add(1);
        }

        info!(bots = placed, "bot population placed");
        Ok(placed)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Copy the cells in `rows` x `cols`, clamped to the grid.
    pub async fn snapshot_region(&self, rows: Range<usize>, cols: Range<usize>) -> Vec<Vec<Cell>> {
        self.shared.world.read().await.grid.snapshot(rows, cols)
    }

    /// Live players ordered by claimed area, then kills.
    ///
    /// Claimed sets are pruned of cells lost to other players first.
    pub async fn standings(&self) -> Vec<Standing> {
        let mut guard = self.shared.world.write().await;
        let state = &mut *guard;
        let grid = &state.grid;

        let mut table: Vec<Standing> = state
            .players
            .values_mut()
            .filter(|p| p.alive)
            .map(|player| {
                let claimed_cells = player.prune_claimed(grid);
                Standing {
                    player_id: player.id,
                    name: player.name.clone(),
                    claimed_cells,
                    claimed_percentage: Player::claimed_percentage(claimed_cells, grid),
                    kills: player.kills,
                    is_bot: player.is_bot(),
                }
            })
            .collect();
        table.sort_by(|a, b| {
            b.claimed_cells
                .cmp(&a.claimed_cells)
                .then(b.kills.cmp(&a.kills))
                .then(a.player_id.cmp(&b.player_id))
        });
        table
    }

    /// Read access to the world, for renderers and tests.
    pub async fn read_world(&self) -> RwLockReadGuard<'_, WorldState> {
        self.shared.world.read().await
    }

    /// The last tick executed.
    pub fn current_tick(&self) -> u64 {
        self.shared.tick.load(Ordering::Acquire)
    }

    /// The configuration this simulation was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.shared.config
    }

    /// Pause, resume and speed controls.
    pub fn control(&self) -> &ControlState {
        &self.shared.control
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Execute one tick directly, without the driver.
    ///
    /// For callers that pace ticks themselves; do not mix with
    /// [`start`](Self::start).
    pub async fn step(&self) -> TickSummary {
        self.shared.run_tick().await
    }

    /// Wait for all background work to finish: pending fills and decisions,
    /// then queued sunsets and rebirths.
    pub async fn settle(&self) {
        self.shared.settle().await;
    }

    /// Populate bots and start the tick driver.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::AlreadyStarted`] on a second call, or the
    /// error from [`populate_bots`](Self::populate_bots).
    pub async fn start(&self) -> Result<(), SimulationError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SimulationError::AlreadyStarted);
        }
        self.populate_bots().await?;

        let shared = Arc::clone(&self.shared);
        let summary_every = shared.config.logging.summary_every;
        let handle = tokio::spawn(async move {
            let result = run_simulation(shared.as_ref(), &shared.control, summary_every).await;
            log_run_end(&result);
            result
        });
        *self.driver.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Wait for the driver to end on its own (tick bound reached).
    ///
    /// Resolves immediately if the driver is not running.
    pub async fn finished(&self) {
        loop {
            let running = self
                .driver
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
                .is_some_and(|handle| !handle.is_finished());
            if !running {
                return;
            }
            tokio::select! {
                () = tokio::time::sleep(self.shared.control.tick_interval()) => {}
                () = self.shared.control.stopped() => return,
            }
        }
    }

    /// Stop the driver, drain fills, decisions, sunsets and rebirths, and
    /// shut the lifecycle pools down.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::NotStarted`] if there is no driver to
    /// stop, or [`SimulationError::Driver`] if it failed.
    pub async fn stop(&self) -> Result<RunResult, SimulationError> {
        let handle = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Err(SimulationError::NotStarted);
        };

        self.shared.control.request_stop();
        let result = handle.await?;
        self.shared.settle().await;
        self.shared.lifecycle.shutdown().await;
        info!(total_ticks = result.total_ticks, "simulation stopped");
        Ok(result)
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.shared.control.request_stop();
    }
}

impl Shared {
    async fn run_tick(&self) -> TickSummary {
        let mut flight = self.in_flight.lock().await;

        // --- Barrier ---
        Self::await_background(&mut flight).await;
        let mut pending = core::mem::take(&mut flight.ready);

        // --- Intake ---
        {
            let mut headings = self.headings_rx.lock().await;
            while let Ok(request) = headings.try_recv() {
                pending.insert(request.player_id, request.heading);
            }
        }

        // --- Resolve ---
        let tick = self.tick.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let resolution = {
            let mut state = self.world.write().await;
            resolve_tick(&mut state, tick, &pending)
        };

        // --- Dispatch ---
        for id in &resolution.deaths {
            self.lifecycle.enqueue_sunset(SunsetRequest {
                player_id: *id,
                respawn: self.config.bots.respawn,
            });
        }
        for id in resolution.fills {
            let filler = Arc::clone(&self.filler);
            let world = Arc::clone(&self.world);
            flight.fills.spawn(async move { filler.fill(world, id).await });
        }
        flight.decisions = Some(DecisionBatch::scatter(
            &self.world,
            resolution.bots,
            Duration::from_millis(self.config.bots.decision_budget_ms),
        ));
        let dropped = self.events.broadcast_tick(tick);
        if dropped > 0 {
            debug!(tick, dropped, "tick notifications dropped");
        }

        resolution.summary
    }

    async fn await_background(flight: &mut InFlight) {
        while let Some(joined) = flight.fills.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "fill task failed");
            }
        }
        if let Some(batch) = flight.decisions.take() {
            let decisions = batch.gather().await;
            flight.ready.extend(decisions);
        }
    }

    async fn settle(&self) {
        {
            let mut flight = self.in_flight.lock().await;
            Self::await_background(&mut flight).await;
        }
        self.lifecycle.settled().await;
    }
}

impl TickStepper for Shared {
    fn step(&self) -> impl Future<Output = TickSummary> + Send {
        self.run_tick()
    }
}

//! Sunset and rebirth worker pools.
//!
//! Dead players are not removed by the tick. Each death is queued as a
//! [`SunsetRequest`] and handled by a pool of sunset workers, which remove
//! the player, release its cells, deliver the death notice and hand human
//! scores to the [`ScoreSink`]. When respawning is enabled the freed slot
//! is then queued for the (usually single) rebirth worker, which places a new
//! bot under the same identifier.
//!
//! Every queued request is counted by a [`WorkGauge`] until it has been
//! fully handled, including the rebirth it may trigger, so callers can
//! wait for the pools to go quiet.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use ouroboros_agents::{DeathReport, SpawnConfig, Strategy, WorldState, rebirth_player, sunset_player};
use ouroboros_types::{DeathNotice, PlayerId, ScoreRecord};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, RwLock, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::WorkersConfig;
use crate::events::EventHub;
use crate::names::bot_name;
use crate::score::ScoreSink;

/// A dead player waiting to be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunsetRequest {
    /// The player to remove.
    pub player_id: PlayerId,
    /// Queue a bot rebirth under the same identifier afterwards.
    pub respawn: bool,
}

#[derive(Debug)]
struct RebirthRequest {
    player_id: PlayerId,
    name: String,
}

// ---------------------------------------------------------------------------
// Work gauge
// ---------------------------------------------------------------------------

/// Counter of lifecycle requests that are queued or in progress.
#[derive(Debug, Default)]
pub struct WorkGauge {
    outstanding: AtomicUsize,
    idle: Notify,
}

impl WorkGauge {
    /// Count one more request.
    pub fn begin(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    /// Mark one request as handled.
    pub fn finish(&self) {
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.idle.notify_waiters();
        }
    }

    /// Requests currently outstanding.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Resolve once no request is outstanding.
    pub async fn settled(&self) {
        loop {
            let idle = self.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            idle.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Worker context
// ---------------------------------------------------------------------------

/// Everything a lifecycle worker touches.
#[derive(Debug, Clone)]
pub struct LifecycleContext {
    /// The shared world.
    pub world: Arc<RwLock<WorldState>>,
    /// Event streams for death notices.
    pub events: Arc<EventHub>,
    /// Receiver of human scores.
    pub sink: Arc<dyn ScoreSink>,
    /// Spawn parameters for reborn bots.
    pub spawn: SpawnConfig,
    /// Strategy given to reborn bots.
    pub strategy: Arc<dyn Strategy>,
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

/// The running sunset and rebirth pools.
#[derive(Debug)]
pub struct LifecyclePools {
    sunset_tx: Mutex<Option<mpsc::Sender<SunsetRequest>>>,
    gauge: Arc<WorkGauge>,
    workers: tokio::sync::Mutex<JoinSet<()>>,
}

impl LifecyclePools {
    /// Spawn both pools. Must be called from within a Tokio runtime.
    pub fn start(context: LifecycleContext, config: &WorkersConfig) -> Self {
        let (sunset_tx, sunset_rx) = mpsc::channel(config.sunset_queue.max(1));
        let (rebirth_tx, rebirth_rx) = mpsc::channel(config.rebirth_queue.max(1));
        let sunset_rx = Arc::new(tokio::sync::Mutex::new(sunset_rx));
        let rebirth_rx = Arc::new(tokio::sync::Mutex::new(rebirth_rx));
        let gauge = Arc::new(WorkGauge::default());
        let mut workers = JoinSet::new();

        for _ in 0..config.sunset_workers.max(1) {
            workers.spawn(sunset_worker(
                context.clone(),
                Arc::clone(&sunset_rx),
                rebirth_tx.clone(),
                Arc::clone(&gauge),
            ));
        }
        // Sunset workers own the only rebirth senders, so the rebirth
        // queue closes once they have drained theirs.
        drop(rebirth_tx);

        for _ in 0..config.rebirth_workers.max(1) {
            workers.spawn(rebirth_worker(
                context.clone(),
                Arc::clone(&rebirth_rx),
                Arc::clone(&gauge),
            ));
        }

        info!(
            sunset_workers = config.sunset_workers.max(1),
            rebirth_workers = config.rebirth_workers.max(1),
            "lifecycle pools started"
        );

        Self {
            sunset_tx: Mutex::new(Some(sunset_tx)),
            gauge,
            workers: tokio::sync::Mutex::new(workers),
        }
    }

    /// Queue a sunset without blocking the caller.
    ///
    /// When the queue is full the request is handed to a background send.
    /// Returns `false` once the pools are shut down.
    pub fn enqueue_sunset(&self, request: SunsetRequest) -> bool {
        let sender = self
            .sunset_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(tx) = sender else {
            return false;
        };

        self.gauge.begin();
        match tx.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                debug!(player_id = %request.player_id, "sunset queue full, deferring");
                let gauge = Arc::clone(&self.gauge);
                tokio::spawn(async move {
                    if tx.send(request).await.is_err() {
                        gauge.finish();
                    }
                });
                true
            }
            Err(TrySendError::Closed(_)) => {
                self.gauge.finish();
                false
            }
        }
    }

    /// The shared request counter.
    pub fn gauge(&self) -> &WorkGauge {
        &self.gauge
    }

    /// Resolve once every queued request has been handled.
    pub async fn settled(&self) {
        self.gauge.settled().await;
    }

    /// Close the queues and wait for both pools to drain and exit.
    pub async fn shutdown(&self) {
        let sender = self
            .sunset_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let mut workers = self.workers.lock().await;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "lifecycle worker failed");
            }
        }
        debug!("lifecycle pools stopped");
    }
}

async fn sunset_worker(
    context: LifecycleContext,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<SunsetRequest>>>,
    rebirths: mpsc::Sender<RebirthRequest>,
    gauge: Arc<WorkGauge>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };
        handle_sunset(&context, request, &rebirths, &gauge).await;
        gauge.finish();
    }
}

async fn handle_sunset(
    context: &LifecycleContext,
    request: SunsetRequest,
    rebirths: &mpsc::Sender<RebirthRequest>,
    gauge: &WorkGauge,
) {
    let id = request.player_id;
    let report = {
        let mut state = context.world.write().await;
        match state.player(id) {
            Some(player) if !player.alive => sunset_player(&mut state, id),
            Some(_) => {
                // The slot was taken over by a new live player.
                debug!(player_id = %id, "sunset skipped, player alive");
                None
            }
            None => None,
        }
    };
    let Some(report) = report else {
        return;
    };

    announce_death(&context.events, context.sink.as_ref(), report).await;

    if request.respawn {
        gauge.begin();
        let rebirth = RebirthRequest {
            player_id: id,
            name: bot_name(id),
        };
        if rebirths.send(rebirth).await.is_err() {
            gauge.finish();
        }
    }
}

/// Deliver the death notice for a removed player and, for a human,
/// hand its final score to `sink`.
pub(crate) async fn announce_death(events: &EventHub, sink: &dyn ScoreSink, report: DeathReport) {
    let id = report.player_id;
    events
        .notify_death(DeathNotice {
            player_id: id,
            claimed_percentage: report.claimed_percentage,
            kills: report.kills,
        })
        .await;

    if report.was_bot {
        return;
    }
    let record = ScoreRecord {
        name: report.name,
        player_id: id,
        claimed_percentage: report.claimed_percentage,
        kills: report.kills,
        recorded_at: Utc::now(),
    };
    if let Err(e) = sink.record(&record) {
        warn!(player_id = %id, error = %e, "score not recorded");
    }
}

async fn rebirth_worker(
    context: LifecycleContext,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<RebirthRequest>>>,
    gauge: Arc<WorkGauge>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };

        let placed = {
            let mut state = context.world.write().await;
            rebirth_player(
                &mut state,
                &context.spawn,
                request.player_id,
                request.name,
                Arc::clone(&context.strategy),
            )
        };
        match placed {
            Ok(Some(at)) => debug!(player_id = %request.player_id, at = %at, "bot reborn"),
            Ok(None) => {}
            Err(e) => warn!(player_id = %request.player_id, error = %e, "rebirth failed"),
        }
        gauge.finish();
    }
}

//! Per-player event streams.
//!
//! Each subscriber gets a bounded queue. Tick notifications are offered
//! with `try_send` and dropped when the queue is full, so a slow consumer
//! never stalls the tick driver. The death notice is the last event on a
//! stream: it waits a bounded time for room, and the stream is closed
//! afterwards either way.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use ouroboros_types::{DeathNotice, PlayerEvent, PlayerId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Registry of subscriber queues keyed by player.
#[derive(Debug)]
pub struct EventHub {
    subscribers: Mutex<BTreeMap<PlayerId, mpsc::Sender<PlayerEvent>>>,
    capacity: usize,
    death_timeout: Duration,
}

impl EventHub {
    /// Create a hub whose queues hold `capacity` events.
    pub fn new(capacity: usize, death_timeout: Duration) -> Self {
        Self {
            subscribers: Mutex::new(BTreeMap::new()),
            capacity: capacity.max(1),
            death_timeout,
        }
    }

    /// Open a stream for `player`, replacing any previous one.
    pub fn subscribe(&self, player: PlayerId) -> mpsc::Receiver<PlayerEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player, tx);
        rx
    }


    /// Offer a tick notification to every stream without waiting.
    ///
    /// Returns the number of notifications dropped because a queue was
    /// full. Streams whose receiver is gone are removed.
    pub fn broadcast_tick(&self, tick: u64) -> usize {
        let mut dropped = 0_usize;
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        subscribers.retain(|player, tx| match tx.try_send(PlayerEvent::TickCompleted { tick }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(player_id = %player, tick, "subscriber lagging, tick event dropped");
                dropped = dropped.saturating_add(1);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        dropped
    }

    /// Deliver the death notice and close the stream.
    ///
    /// Returns whether the notice was delivered.
    pub async fn notify_death(&self, notice: DeathNotice) -> bool {
        let player = notice.player_id;
        let sender = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player);
        let Some(tx) = sender else {
            return false;
        };

        match tx
            .send_timeout(PlayerEvent::Died(notice), self.death_timeout)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(player_id = %player, error = %e, "death notice not delivered");
                false
            }
        }
    }
}

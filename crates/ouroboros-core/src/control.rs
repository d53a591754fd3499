//! Runtime control of the tick driver.
//!
//! [`ControlState`] is shared between the driver task and whoever owns the
//! [`Simulation`](crate::simulation::Simulation). Every field is atomic so
//! the driver reads it without locking on each tick; [`Notify`] wakes the
//! driver out of a pause or a sleep.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

/// Why the driver loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Reached the configured `max_ticks`.
    MaxTicksReached,
    /// [`ControlState::request_stop`] was called.
    Stopped,
}

/// Pause, stop and speed controls for the driver.
#[derive(Debug)]
pub struct ControlState {
    /// Whether the driver should hold before the next tick.
    paused: AtomicBool,

    /// Wakes the driver when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the driver when a stop is requested.
    stop_notify: Notify,

    /// Current tick interval in milliseconds.
    tick_interval_ms: AtomicU64,

    /// Tick bound (0 = unlimited).
    max_ticks: u64,

    /// Wall-clock creation time.
    started_at: DateTime<Utc>,
}

impl ControlState {
    /// Create a running (unpaused) control state.
    pub fn new(tick_interval_ms: u64, max_ticks: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            tick_interval_ms: AtomicU64::new(tick_interval_ms.max(1)),
            max_ticks,
            started_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the driver is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Hold the driver before its next tick.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the driver.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_waiters();
    }

    /// Wait until not paused (or a stop is requested).
    pub async fn wait_if_paused(&self) {
        loop {
            let resumed = self.resume_notify.notified();
            let stopped = self.stop_notify.notified();
            if !self.is_paused() || self.is_stop_requested() {
                return;
            }
            tokio::select! {
                () = resumed => {}
                () = stopped => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop. Idempotent.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
        self.resume_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Current tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.load(Ordering::Acquire))
    }

    /// Change the tick interval, effective from the next tick.
    ///
    /// Returns the previous interval in milliseconds, or `None` if `ms`
    /// is zero.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms == 0 {
            return None;
        }
        Some(self.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `current_tick` has reached the tick bound.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Configured tick bound (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Seconds since this control state was created.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn pause_and_resume() {
        let control = ControlState::new(100, 0);
        assert!(!control.is_paused());
        control.pause();
        assert!(control.is_paused());
        control.resume();
        assert!(!control.is_paused());
    }

    #[test]
    fn interval_rejects_zero() {
        let control = ControlState::new(100, 0);
        assert_eq!(control.set_tick_interval_ms(0), None);
        assert_eq!(control.set_tick_interval_ms(70), Some(100));
        assert_eq!(control.tick_interval(), Duration::from_millis(70));
    }

    #[test]
    fn tick_limit() {
        assert!(!ControlState::new(100, 0).tick_limit_reached(u64::MAX));
        let bounded = ControlState::new(100, 10);
        assert!(!bounded.tick_limit_reached(9));
        assert!(bounded.tick_limit_reached(10));
    }

    #[tokio::test]
    async fn stop_wakes_a_paused_waiter() {
        let control = Arc::new(ControlState::new(100, 0));
        control.pause();

        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move { control.wait_if_paused().await })
        };
        tokio::task::yield_now().await;
        control.request_stop();

        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
        // Already stopped: returns at once.
        control.stopped().await;
    }
}

//! The tick driver loop.
//!
//! [`run_simulation`] repeatedly calls a [`TickStepper`] and adds the
//! control plane around it:
//!
//! - **Bounded runs**: stop after `max_ticks`
//! - **Pause/resume**: hold before the next tick
//! - **Variable tick speed**: the interval is re-read every tick
//! - **Clean stop**: a stop request interrupts the inter-tick sleep
//!
//! Ticks start on a fixed schedule. A tick that overruns its slot pushes
//! the schedule back rather than triggering a burst of catch-up ticks.

use std::future::Future;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::control::{ControlState, EndReason};
use crate::tick::TickSummary;

/// Something that can execute one full tick.
pub trait TickStepper: Send + Sync {
    /// Run one tick to completion and report its counters.
    fn step(&self) -> impl Future<Output = TickSummary> + Send;
}

/// Result of a driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Why the loop returned.
    pub end_reason: EndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Ticks executed by this run.
    pub total_ticks: u64,
}

/// Drive `stepper` until the tick bound is hit or a stop is requested.
///
/// A summary is logged at `info` every `summary_every` ticks (0 disables
/// it); every other tick is logged at `debug`.
pub async fn run_simulation<S: TickStepper + ?Sized>(
    stepper: &S,
    control: &ControlState,
    summary_every: u64,
) -> RunResult {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;
    let mut next_start = Instant::now();

    info!(
        max_ticks = control.max_ticks(),
        tick_interval_ms = u64::try_from(control.tick_interval().as_millis()).unwrap_or(u64::MAX),
        "tick driver starting"
    );

    loop {
        // --- Check pause ---
        if control.is_paused() {
            info!("tick driver paused");
            control.wait_if_paused().await;
            info!("tick driver resumed");
            next_start = Instant::now();
        }

        // --- Check stop request (before tick) ---
        if control.is_stop_requested() {
            info!("stop requested");
            return RunResult {
                end_reason: EndReason::Stopped,
                final_summary: last_summary,
                total_ticks,
            };
        }

        // --- Execute tick ---
        let summary = stepper.step().await;
        total_ticks = total_ticks.saturating_add(1);

        if summary_every > 0 && summary.tick.checked_rem(summary_every) == Some(0) {
            info!(
                tick = summary.tick,
                live = summary.live_players,
                moves = summary.moves,
                deaths = summary.deaths,
                fills = summary.fills,
                "tick summary"
            );
        } else {
            debug!(tick = summary.tick, live = summary.live_players, deaths = summary.deaths, "tick");
        }

        // --- Check tick limit (after tick) ---
        if control.tick_limit_reached(summary.tick) {
            info!(tick = summary.tick, max_ticks = control.max_ticks(), "tick limit reached");
            return RunResult {
                end_reason: EndReason::MaxTicksReached,
                final_summary: Some(summary),
                total_ticks,
            };
        }
        last_summary = Some(summary);

        // --- Sleep until the next slot ---
        let now = Instant::now();
        next_start = next_start
            .checked_add(control.tick_interval())
            .filter(|at| *at > now)
            .unwrap_or(now);
        tokio::select! {
            () = tokio::time::sleep_until(next_start) => {}
            () = control.stopped() => {}
        }
    }
}

/// Log how a driver run ended.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        final_live = result.final_summary.as_ref().map(|s| s.live_players),
        "tick driver ended"
    );
    if result.final_summary.is_none() {
        warn!("tick driver ended with no ticks executed");
    }
}

//! Headless engine for the Ouroboros territory simulation.
//!
//! Runs a bot-populated world with no session layer attached. Useful for
//! soak runs, profiling the fill and lifecycle pools, and tuning bots.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `ouroboros-config.yaml` (or the path given
//!    as the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the simulation and populate bots
//! 4. Run the tick driver until Ctrl-C or the tick bound
//! 5. Stop, drain the worker pools and log the standings

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use ouroboros_core::config::LoggingConfig;
use ouroboros_core::{LogScoreSink, Simulation, SimulationConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file looked up in the working directory.
const DEFAULT_CONFIG_PATH: &str = "ouroboros-config.yaml";

/// Standings rows logged at shutdown.
const STANDINGS_SHOWN: usize = 10;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration loading or the simulation fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("ouroboros-engine starting");
    match source {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("config file not found, using defaults"),
    }
    info!(
        rows = config.world.rows,
        cols = config.world.cols,
        bots = config.bots.count,
        tick_interval_ms = config.world.tick_interval_ms,
        max_ticks = config.world.max_ticks,
        "world parameters"
    );

    // 3. Build and start.
    let sim = Simulation::new(config, Arc::new(LogScoreSink))?;
    sim.start().await?;

    // 4. Run until interrupted or bounded.
    tokio::select! {
        () = sim.finished() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("interrupt received, stopping");
        }
    }

    // 5. Drain and report.
    let result = sim.stop().await?;
    for (rank, standing) in sim.standings().await.iter().take(STANDINGS_SHOWN).enumerate() {
        info!(
            rank = rank.saturating_add(1),
            player_id = %standing.player_id,
            name = %standing.name,
            claimed = standing.claimed_percentage,
            kills = standing.kills,
            bot = standing.is_bot,
            "standing"
        );
    }

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "ouroboros-engine shutdown complete"
    );
    Ok(())
}

/// Load the simulation configuration.
///
/// Uses the first command-line argument as the path if given, otherwise
/// `ouroboros-config.yaml` in the working directory.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    resolve_config(std::env::args_os().nth(1).map(PathBuf::from))
}

/// Load `explicit` if given; it must exist. Without it, the default file
/// is read when present and the defaults with environment overrides are
/// used when it is not.
fn resolve_config(
    explicit: Option<PathBuf>,
) -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !path.exists() {
                let mut config = SimulationConfig::default();
                config.apply_env_overrides(|key| std::env::var(key).ok());
                return Ok((config, None));
            }
            path
        }
    };

    let config = SimulationConfig::from_file(&path)?;
    Ok((config, Some(path)))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_config_is_an_error() {
        let path = std::env::temp_dir().join("ouroboros-engine-no-such-config.yaml");
        let err = resolve_config(Some(path)).unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let path = std::env::temp_dir().join(format!(
            "ouroboros-engine-config-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "world:\n  rows: 40\n  cols: 30\n").unwrap();

        let (config, source) = resolve_config(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(source, Some(path));
        assert_eq!(config.world.rows, 40);
        assert_eq!(config.world.cols, 30);
    }
}

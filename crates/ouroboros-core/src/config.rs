//! Configuration loading and typed config structures for the simulation.
//!
//! The canonical configuration lives in `ouroboros-config.yaml` at the
//! project root. Every field has a default matching the classic game, so
//! an empty file (or no file) yields a playable 700x500 world with 250
//! bots ticking every 100 ms.

use std::path::Path;

use ouroboros_agents::{SpawnConfig, StrategyConfig};
use ouroboros_types::PlayerId;
use serde::Deserialize;

/// Identifier rendered as the wall color; never handed to a player.
pub const WALL_IDENTIFIER: u16 = 172;

/// Identifier rendered as empty space; never handed to a player.
pub const VOID_IDENTIFIER: u16 = 233;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot drive a simulation.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `ouroboros-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Grid size, timing and seed.
    #[serde(default)]
    pub world: WorldConfig,

    /// Identifier space, spawning and per-player queues.
    #[serde(default)]
    pub players: PlayersConfig,

    /// Bot population and decision tunables.
    #[serde(default)]
    pub bots: BotsConfig,

    /// Worker pool sizes.
    #[serde(default)]
    pub workers: WorkersConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `OUROBOROS_TICK_INTERVAL_MS` overrides `world.tick_interval_ms`
    /// - `OUROBOROS_BOT_COUNT` overrides `bots.count`
    /// - `OUROBOROS_SEED` overrides `world.seed`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override values from `lookup` (normally the process environment).
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("OUROBOROS_TICK_INTERVAL_MS").and_then(|v| v.trim().parse().ok()) {
            self.world.tick_interval_ms = ms;
        }
        if let Some(count) = lookup("OUROBOROS_BOT_COUNT").and_then(|v| v.trim().parse().ok()) {
            self.bots.count = count;
        }
        if let Some(seed) = lookup("OUROBOROS_SEED").and_then(|v| v.trim().parse().ok()) {
            self.world.seed = Some(seed);
        }
    }

    /// Reject values that cannot drive a simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };

        if self.world.rows < 3 || self.world.cols < 3 {
            return invalid("world must be at least 3x3 cells including walls");
        }
        if self.world.tick_interval_ms == 0 {
            return invalid("world.tick_interval_ms must be positive");
        }
        if self.players.event_queue == 0 || self.players.heading_queue == 0 {
            return invalid("player queues must hold at least one entry");
        }
        if self.workers.fill_concurrency == 0
            || self.workers.sunset_workers == 0
            || self.workers.rebirth_workers == 0
        {
            return invalid("worker pools must have at least one worker");
        }
        if self.workers.sunset_queue == 0 || self.workers.rebirth_queue == 0 {
            return invalid("lifecycle queues must hold at least one entry");
        }
        if self.workers.max_pocket_cells == 0 {
            return invalid("workers.max_pocket_cells must be positive");
        }
        Ok(())
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Row count including the wall (default: 500).
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Column count including the wall (default: 700).
    #[serde(default = "default_cols")]
    pub cols: usize,

    /// Milliseconds between ticks (default: 100).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seed for spawn sampling; unset draws from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
            max_ticks: 0,
        }
    }
}

/// Player identifier space, spawning and queues.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayersConfig {
    /// Highest identifier a player may hold (default: 255).
    #[serde(default = "default_max_identifier")]
    pub max_identifier: u16,

    /// Identifiers never handed out (default: wall and void colors).
    #[serde(default = "default_reserved")]
    pub reserved: Vec<u16>,

    /// Chebyshev radius of the home block granted on spawn (default: 1).
    #[serde(default = "default_home_radius")]
    pub home_radius: usize,

    /// Random candidates per spawn (default: 300).
    #[serde(default = "default_spawn_samples")]
    pub spawn_samples: u32,

    /// Wall clearance when sampling spawns (default: 10).
    #[serde(default = "default_spawn_margin")]
    pub spawn_margin: usize,

    /// Capacity of each subscriber's event queue (default: 256).
    #[serde(default = "default_event_queue")]
    pub event_queue: usize,

    /// Longest wait to deliver a death notice to a full queue
    /// (default: 100).
    #[serde(default = "default_death_notice_timeout_ms")]
    pub death_notice_timeout_ms: u64,

    /// Capacity of the pending-heading queue (default: 1024).
    #[serde(default = "default_heading_queue")]
    pub heading_queue: usize,
}

impl PlayersConfig {
    /// Whether `id` may be assigned to a player.
    pub fn is_assignable(&self, id: PlayerId) -> bool {
        id.into_inner() <= self.max_identifier && !self.reserved.contains(&id.into_inner())
    }

    /// Spawn tunables for the agents crate.
    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig {
            samples: self.spawn_samples,
            safe_margin: self.spawn_margin,
            home_radius: self.home_radius,
        }
    }
}

impl Default for PlayersConfig {
    fn default() -> Self {
        Self {
            max_identifier: default_max_identifier(),
            reserved: default_reserved(),
            home_radius: default_home_radius(),
            spawn_samples: default_spawn_samples(),
            spawn_margin: default_spawn_margin(),
            event_queue: default_event_queue(),
            death_notice_timeout_ms: default_death_notice_timeout_ms(),
            heading_queue: default_heading_queue(),
        }
    }
}

/// Bot population and decision configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BotsConfig {
    /// Bots created by `start` (default: 250).
    #[serde(default = "default_bot_count")]
    pub count: u16,

    /// Whether dead slots come back as bots (default: true).
    #[serde(default = "default_true")]
    pub respawn: bool,

    /// Expected settle time for one tick's bot decisions; longer batches
    /// are logged as overruns (default: 50).
    #[serde(default = "default_decision_budget_ms")]
    pub decision_budget_ms: u64,

    /// Threat radius around the trail (default: 3).
    #[serde(default = "default_threat_radius")]
    pub threat_radius: usize,

    /// Nearest-territory search depth (default: 15).
    #[serde(default = "default_search_depth")]
    pub search_depth: usize,

    /// Trail length worth closing unthreatened (default: 3).
    #[serde(default = "default_min_loop_trail")]
    pub min_loop_trail: usize,

    /// Trail length beyond which drifting from center is penalized
    /// (default: 5).
    #[serde(default = "default_center_trail_threshold")]
    pub center_trail_threshold: usize,
}

impl BotsConfig {
    /// Strategy tunables for the agents crate.
    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            threat_radius: self.threat_radius,
            search_depth: self.search_depth,
            min_loop_trail: self.min_loop_trail,
            center_trail_threshold: self.center_trail_threshold,
            ..StrategyConfig::default()
        }
    }
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            count: default_bot_count(),
            respawn: true,
            decision_budget_ms: default_decision_budget_ms(),
            threat_radius: default_threat_radius(),
            search_depth: default_search_depth(),
            min_loop_trail: default_min_loop_trail(),
            center_trail_threshold: default_center_trail_threshold(),
        }
    }
}

/// Worker pool sizes and queue capacities.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkersConfig {
    /// Concurrent pocket searches across all fills (default: 25).
    #[serde(default = "default_fill_concurrency")]
    pub fill_concurrency: usize,

    /// Largest pocket still treated as enclosed (default: 400000).
    #[serde(default = "default_max_pocket_cells")]
    pub max_pocket_cells: usize,

    /// Sunset workers (default: 50).
    #[serde(default = "default_sunset_workers")]
    pub sunset_workers: usize,

    /// Rebirth workers (default: 1).
    #[serde(default = "default_rebirth_workers")]
    pub rebirth_workers: usize,

    /// Sunset queue capacity (default: 256).
    #[serde(default = "default_lifecycle_queue")]
    pub sunset_queue: usize,

    /// Rebirth queue capacity (default: 256).
    #[serde(default = "default_lifecycle_queue")]
    pub rebirth_queue: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            fill_concurrency: default_fill_concurrency(),
            max_pocket_cells: default_max_pocket_cells(),
            sunset_workers: default_sunset_workers(),
            rebirth_workers: default_rebirth_workers(),
            sunset_queue: default_lifecycle_queue(),
            rebirth_queue: default_lifecycle_queue(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (default: `info`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Log a summary every this many ticks (default: 50).
    #[serde(default = "default_summary_every")]
    pub summary_every: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            summary_every: default_summary_every(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_rows() -> usize {
    500
}

const fn default_cols() -> usize {
    700
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_max_identifier() -> u16 {
    255
}

fn default_reserved() -> Vec<u16> {
    vec![WALL_IDENTIFIER, VOID_IDENTIFIER]
}

const fn default_home_radius() -> usize {
    1
}

const fn default_spawn_samples() -> u32 {
    300
}

const fn default_spawn_margin() -> usize {
    10
}

const fn default_event_queue() -> usize {
    256
}

const fn default_death_notice_timeout_ms() -> u64 {
    100
}

const fn default_heading_queue() -> usize {
    1024
}

const fn default_bot_count() -> u16 {
    250
}

const fn default_true() -> bool {
    true
}

const fn default_decision_budget_ms() -> u64 {
    50
}

const fn default_threat_radius() -> usize {
    3
}

const fn default_search_depth() -> usize {
    15
}

const fn default_min_loop_trail() -> usize {
    3
}

const fn default_center_trail_threshold() -> usize {
    5
}

const fn default_fill_concurrency() -> usize {
    25
}

const fn default_max_pocket_cells() -> usize {
    400_000
}

const fn default_sunset_workers() -> usize {
    50
}

const fn default_rebirth_workers() -> usize {
    1
}

const fn default_lifecycle_queue() -> usize {
    256
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_summary_every() -> u64 {
    50
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn defaults_match_the_classic_game() {
        let config = SimulationConfig::default();
        assert_eq!((config.world.rows, config.world.cols), (500, 700));
        assert_eq!(config.world.tick_interval_ms, 100);
        assert_eq!(config.bots.count, 250);
        assert_eq!(config.workers.fill_concurrency, 25);
        assert_eq!(config.workers.sunset_workers, 50);
        assert_eq!(config.workers.rebirth_workers, 1);
        assert_eq!(config.players.event_queue, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = "
world:
  rows: 40
  cols: 60
  seed: 9
bots:
  count: 12
  respawn: false
workers:
  fill_concurrency: 4
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.rows, 40);
        assert_eq!(config.world.cols, 60);
        assert_eq!(config.world.seed, Some(9));
        assert_eq!(config.world.tick_interval_ms, 100);
        assert_eq!(config.bots.count, 12);
        assert!(!config.bots.respawn);
        assert_eq!(config.workers.fill_concurrency, 4);
        assert_eq!(config.workers.sunset_workers, 50);
        assert_eq!(config.players.reserved, vec![172, 233]);
    }

    #[test]
    fn parse_empty_yaml() {
        assert_eq!(SimulationConfig::parse("").unwrap(), SimulationConfig::default());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let err = SimulationConfig::parse("world: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let env: BTreeMap<&str, &str> = BTreeMap::from([
            ("OUROBOROS_TICK_INTERVAL_MS", "70"),
            ("OUROBOROS_BOT_COUNT", "lots"),
            ("OUROBOROS_SEED", "1234"),
        ]);
        let mut config = SimulationConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| (*v).to_owned()));

        assert_eq!(config.world.tick_interval_ms, 70);
        assert_eq!(config.bots.count, 250);
        assert_eq!(config.world.seed, Some(1234));
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        let mut config = SimulationConfig::default();
        config.world.rows = 2;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = SimulationConfig::default();
        config.workers.fill_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.players.event_queue = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reserved_identifiers_are_not_assignable() {
        let players = PlayersConfig::default();
        assert!(players.is_assignable(PlayerId::new(0)));
        assert!(!players.is_assignable(PlayerId::new(WALL_IDENTIFIER)));
        assert!(!players.is_assignable(PlayerId::new(VOID_IDENTIFIER)));
        assert!(!players.is_assignable(PlayerId::new(256)));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("ouroboros-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
            assert!(config.unwrap().validate().is_ok());
        }
    }
}

//! Tunables for bot decisions and player placement.
//!
//! These structs carry plain values; the simulation crate builds them from
//! the `bots` and `players` sections of `ouroboros-config.yaml`. Defaults
//! reproduce the behaviour of the classic game.

/// Weights and thresholds for the [`HeuristicStrategy`].
///
/// [`HeuristicStrategy`]: crate::strategy::HeuristicStrategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyConfig {
    /// Opponent heads within this Manhattan distance of the trail count as
    /// a threat (default: 3).
    pub threat_radius: usize,

    /// Threat contributed per step of closeness inside the radius
    /// (default: 500).
    pub threat_weight: u32,

    /// Shortest trail that can be threatened at all (default: 2).
    pub min_threat_trail: usize,

    /// Shortest trail worth closing without being threatened (default: 3).
    pub min_loop_trail: usize,

    /// Depth bound of the nearest-territory search (default: 15).
    pub search_depth: usize,

    /// Score bonus for continuing straight (default: 2).
    pub straight_bias: i64,

    /// Score penalty for moving away from the grid center (default: 50).
    pub center_penalty: i64,

    /// Trail length above which the center penalty applies (default: 5).
    pub center_trail_threshold: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            threat_radius: 3,
            threat_weight: 500,
            min_threat_trail: 2,
            min_loop_trail: 3,
            search_depth: 15,
            straight_bias: 2,
            center_penalty: 50,
            center_trail_threshold: 5,
        }
    }
}

/// How new players are placed on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnConfig {
    /// Random candidate cells sampled per spawn (default: 300).
    pub samples: u32,

    /// Distance from the wall kept clear when sampling (default: 10).
    /// Shrunk automatically on grids too small to honor it.
    pub safe_margin: usize,

    /// Chebyshev radius of the home territory granted on spawn
    /// (default: 1, a 3x3 block).
    pub home_radius: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            samples: 300,
            safe_margin: 10,
            home_radius: 1,
        }
    }
}

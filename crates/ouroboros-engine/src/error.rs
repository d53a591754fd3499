//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ouroboros_core::config::ConfigError,
    },

    /// Building, starting or stopping the simulation failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: ouroboros_core::SimulationError,
    },
}

//! Tick driver and orchestration for the Ouroboros simulation.
//!
//! This crate owns the four-phase tick (Barrier, Intake, Resolve, Dispatch)
//! and every concurrent moving part around it: bot decision scatter and
//! gather, territory fills, the sunset and rebirth pools, and per-player
//! event streams.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `ouroboros-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- Pause, resume, speed and stop controls.
//! - [`decision`] -- Deadline-bounded bot decision batches.
//! - [`events`] -- Bounded per-player event streams.
//! - [`lifecycle`] -- Sunset and rebirth worker pools.
//! - [`names`] -- Bot display names.
//! - [`runner`] -- The tick driver loop.
//! - [`score`] -- [`ScoreSink`] and its stock implementations.
//! - [`simulation`] -- [`Simulation`], the public entry point.
//! - [`tick`] -- Movement and collision resolution.
//!
//! [`ScoreSink`]: score::ScoreSink
//! [`Simulation`]: simulation::Simulation

pub mod config;
pub mod control;
pub mod decision;
pub mod events;
pub mod lifecycle;
pub mod names;
pub mod runner;
pub mod score;
pub mod simulation;
pub mod tick;

pub use config::SimulationConfig;
pub use control::{ControlState, EndReason};
pub use runner::RunResult;
pub use score::{LogScoreSink, MemoryScoreSink, NullScoreSink, ScoreSink, ScoreSinkError};
pub use simulation::{Simulation, SimulationError, Standing};
pub use tick::TickSummary;

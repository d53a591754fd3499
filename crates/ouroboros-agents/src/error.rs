//! Error types for the ouroboros-agents crate.
//!
//! Player placement is the only agent operation that can fail outright;
//! everything else degrades to a no-op for a missing or dead player.

use ouroboros_types::PlayerId;

/// Errors that can occur while creating or looking up players.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No unclaimed interior cell is left to spawn on.
    #[error("no spawn cell available for player {player_id}")]
    NoSpawnCell {
        /// The player that could not be placed.
        player_id: PlayerId,
    },

    /// The player is not in the live-player registry.
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),
}

//! Per-player notifications and records handed to collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::Heading;
use crate::ids::PlayerId;

/// A direction change submitted by a session handler, applied at the start
/// of the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingRequest {
    /// The player asking to turn.
    pub player_id: PlayerId,
    /// The requested heading.
    pub heading: Heading,
}

/// Final statistics delivered once when a player dies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathNotice {
    /// The player that died.
    pub player_id: PlayerId,
    /// Share of the playable area the player owned at death, in percent.
    pub claimed_percentage: f64,
    /// Number of kills credited to the player.
    pub kills: u32,
}

/// A notification on a player's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// A tick finished resolving.
    TickCompleted {
        /// The tick number that completed.
        tick: u64,
    },
    /// The subscribed player died. This is the last event on the stream.
    Died(DeathNotice),
}

/// A high-score record handed to the persistence collaborator on death.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Display name of the player.
    pub name: String,
    /// Identifier (color) the player held.
    pub player_id: PlayerId,
    /// Share of the playable area owned at death, in percent.
    pub claimed_percentage: f64,
    /// Kills credited to the player.
    pub kills: u32,
    /// Wall-clock time the record was produced.
    pub recorded_at: DateTime<Utc>,
}

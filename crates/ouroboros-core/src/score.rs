//! High-score hand-off.
//!
//! When a human player is sunset, its final statistics are handed to a
//! [`ScoreSink`]. Recording is fire-and-forget: a failing sink is logged
//! and never affects the simulation.

use std::sync::{Mutex, PoisonError};

use ouroboros_types::ScoreRecord;
use tracing::info;

/// Errors a score sink may report.
#[derive(Debug, thiserror::Error)]
pub enum ScoreSinkError {
    /// The backend refused or failed to store the record.
    #[error("score sink rejected record: {reason}")]
    Rejected {
        /// Why the record was not stored.
        reason: String,
    },
}

/// Consumer of final player statistics.
pub trait ScoreSink: Send + Sync + core::fmt::Debug {
    /// Store one record. Called from lifecycle workers; keep it quick.
    fn record(&self, record: &ScoreRecord) -> Result<(), ScoreSinkError>;
}

/// Writes records to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogScoreSink;

impl ScoreSink for LogScoreSink {
    fn record(&self, record: &ScoreRecord) -> Result<(), ScoreSinkError> {
        info!(
            name = %record.name,
            player_id = %record.player_id,
            claimed = record.claimed_percentage,
            kills = record.kills,
            at = %record.recorded_at,
            "final score"
        );
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScoreSink;

impl ScoreSink for NullScoreSink {
    fn record(&self, _record: &ScoreRecord) -> Result<(), ScoreSinkError> {
        Ok(())
    }
}

/// Keeps records in memory, newest last.
#[derive(Debug, Default)]
pub struct MemoryScoreSink {
    records: Mutex<Vec<ScoreRecord>>,
}

impl MemoryScoreSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn records(&self) -> Vec<ScoreRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ScoreSink for MemoryScoreSink {
    fn record(&self, record: &ScoreRecord) -> Result<(), ScoreSinkError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use ouroboros_types::PlayerId;

    use super::*;

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemoryScoreSink::new();
        for (i, name) in ["a", "b"].into_iter().enumerate() {
            let record = ScoreRecord {
                name: name.to_owned(),
                player_id: PlayerId::new(u16::try_from(i).unwrap_or_default()),
                claimed_percentage: 0.5,
                kills: 0,
                recorded_at: Utc::now(),
            };
            assert!(sink.record(&record).is_ok());
        }
        let names: Vec<String> = sink.records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(NullScoreSink.record(&sink.records()[0]).is_ok());
    }
}

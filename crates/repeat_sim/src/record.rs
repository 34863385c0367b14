//! Recording of simulation runs for reproducibility.

use crate::seed::SimSeed;
use repeat_runtime::SyncMetrics;
use serde::{Deserialize, Serialize};

/// How a round's pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// The pass ran to completion and was verified
    Completed,
    /// The pass was still running when the next round started
    Superseded,
    /// The pass was aborted
    Aborted,
}

/// Record of one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number
    pub round: usize,
    /// Length of the list synchronized
    pub length: usize,
    /// Frames delivered during the round
    pub frames: u32,
    /// How the pass ended
    pub outcome: RoundOutcome,
}

/// Record of a simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRecord {
    /// Seed used for the simulation
    pub seed: SimSeed,
    /// Rounds in order
    pub rounds: Vec<RoundRecord>,
    /// Counters of the simulated repeat at the end of the run
    pub metrics: SyncMetrics,
}

impl SimRecord {
    /// Create an empty record
    #[must_use]
    pub fn new(seed: SimSeed) -> Self {
        Self {
            seed,
            rounds: Vec::new(),
            metrics: SyncMetrics::default(),
        }
    }

    /// Append a round
    pub fn push(&mut self, round: RoundRecord) {
        self.rounds.push(round);
    }

    /// Number of rounds recorded
    #[must_use]
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Rounds that ended with `outcome`
    #[must_use]
    pub fn rounds_with(&self, outcome: RoundOutcome) -> Vec<&RoundRecord> {
        self.rounds.iter().filter(|round| round.outcome == outcome).collect()
    }

    /// Total frames delivered
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.rounds.iter().map(|round| u64::from(round.frames)).sum()
    }

    /// Serialize to JSON
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserialize from JSON
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for SimRecord {
    fn default() -> Self {
        Self::new(SimSeed::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(round: usize, frames: u32, outcome: RoundOutcome) -> RoundRecord {
        RoundRecord {
            round,
            length: 4,
            frames,
            outcome,
        }
    }

    #[test]
    fn test_sim_record_new() {
        let record = SimRecord::new(SimSeed::from_literal(3));
        assert_eq!(record.seed.value, 3);
        assert_eq!(record.round_count(), 0);
        assert_eq!(record.total_frames(), 0);
    }

    #[test]
    fn test_sim_record_rounds() {
        let mut record = SimRecord::default();
        record.push(round(0, 2, RoundOutcome::Completed));
        record.push(round(1, 1, RoundOutcome::Aborted));
        record.push(round(2, 0, RoundOutcome::Completed));

        assert_eq!(record.round_count(), 3);
        assert_eq!(record.total_frames(), 3);
        assert_eq!(record.rounds_with(RoundOutcome::Completed).len(), 2);
        assert_eq!(record.rounds_with(RoundOutcome::Superseded).len(), 0);
    }

    #[test]
    fn test_sim_record_json() {
        let mut record = SimRecord::new(SimSeed::from_string("json"));
        record.push(round(0, 5, RoundOutcome::Superseded));
        record.metrics.record_deviation();

        let json = record.to_json();
        let back = SimRecord::from_json(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_sim_record_from_bad_json() {
        assert!(SimRecord::from_json("{").is_err());
    }
}

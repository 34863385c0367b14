//! Synchronization metrics.
//!
//! Counters over the lifetime of a repeat, updated by the synchronizer and
//! the scheduler.

use serde::{Deserialize, Serialize};

/// Synchronization counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetrics {
    /// Passes started
    pub passes_started: u64,
    /// Passes run to completion
    pub passes_completed: u64,
    /// Passes cancelled by restart or abort
    pub passes_aborted: u64,
    /// Steps executed
    pub steps: u64,
    /// Nodes built from the template
    pub materialized: u64,
    /// Carcasses rebound to new items
    pub revived: u64,
    /// Nodes released
    pub disposed: u64,
    /// Presumed dead nodes found again later in the scan
    pub resurrected: u64,
    /// Nodes marked presumed dead
    pub presumed_dead: u64,
    /// Slices that ran out of budget
    pub deviations: u64,
}

impl SyncMetrics {
    /// Create new metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pass start
    pub fn record_pass_start(&mut self) {
        self.passes_started += 1;
    }

    /// Record a pass completion
    pub fn record_pass_complete(&mut self) {
        self.passes_completed += 1;
    }

    /// Record a cancelled pass
    pub fn record_pass_abort(&mut self) {
        self.passes_aborted += 1;
    }

    /// Record a step
    pub fn record_step(&mut self) {
        self.steps += 1;
    }

    /// Record a node built from the template
    pub fn record_materialize(&mut self) {
        self.materialized += 1;
    }

    /// Record a carcass revival
    pub fn record_revive(&mut self) {
        self.revived += 1;
    }

    /// Record released nodes
    pub fn record_dispose(&mut self, count: u64) {
        self.disposed += count;
    }

    /// Record a resurrection
    pub fn record_resurrect(&mut self) {
        self.resurrected += 1;
    }

    /// Record a node presumed dead
    pub fn record_presumed_dead(&mut self) {
        self.presumed_dead += 1;
    }

    /// Record an exhausted slice
    pub fn record_deviation(&mut self) {
        self.deviations += 1;
    }

    /// Share of additions served by revival (0.0 - 1.0)
    #[must_use]
    pub fn recycle_rate(&self) -> f64 {
        let additions = self.materialized + self.revived;
        if additions == 0 {
            return 0.0;
        }
        self.revived as f64 / additions as f64
    }

    /// Reset metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

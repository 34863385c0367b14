//! Simulation harness for seeded synchronization runs.
//!
//! Each round of a scenario is synchronized by an incremental repeat whose
//! slices are measured on a manual clock, so every run is reproducible from
//! its seed. Completed passes are compared with a repeat that rendered the
//! same list from scratch.

use crate::error::{InRound, SimError, SimOutcome};
use crate::record::{RoundOutcome, RoundRecord, SimRecord};
use crate::scenario::{Interruption, Scenario, ScenarioModel};
use crate::seed::SimSeed;
use repeat_core::{CoreResult, IdentitySelector, ManualClock, SyncMode};
use repeat_runtime::{FrameQueue, IndexedRepeat, MemoryHost, RepeatConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

type SimRepeat = IndexedRepeat<u32, MemoryHost<u32>, ManualClock, FrameQueue>;

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for reproducibility
    pub seed: SimSeed,
    /// Shape of the generated scenario
    pub model: ScenarioModel,
    /// Budget of every slice in milliseconds
    pub slice_ms: u64,
    /// Simulated cost of one clock read in milliseconds
    pub step_cost_ms: u64,
    /// Reuse removed nodes
    pub element_recycling: bool,
}

impl SimConfig {
    /// Create a new simulation config
    #[must_use]
    pub fn new(seed: SimSeed) -> Self {
        Self {
            seed,
            model: ScenarioModel::default(),
            slice_ms: 3,
            step_cost_ms: 1,
            element_recycling: true,
        }
    }

    /// Set the number of rounds
    #[must_use]
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.model.rounds = rounds;
        self
    }

    /// Set the scenario model
    #[must_use]
    pub fn with_model(mut self, model: ScenarioModel) -> Self {
        self.model = model;
        self
    }

    /// Set the slice budget
    #[must_use]
    pub fn with_slice(mut self, slice_ms: u64) -> Self {
        self.slice_ms = slice_ms;
        self
    }

    /// Enable or disable recycling
    #[must_use]
    pub fn with_recycling(mut self, element_recycling: bool) -> Self {
        self.element_recycling = element_recycling;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(SimSeed::default())
    }
}

/// Simulation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimResult {
    /// Whether every check passed
    pub success: bool,
    /// Number of rounds executed
    pub rounds_executed: usize,
    /// Error message if failed
    pub error: Option<String>,
    /// Run record
    pub record: SimRecord,
}

impl SimResult {
    /// Create a successful result
    #[must_use]
    pub fn success(record: SimRecord) -> Self {
        Self {
            success: true,
            rounds_executed: record.round_count(),
            error: None,
            record,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(record: SimRecord, error: String) -> Self {
        Self {
            success: false,
            rounds_executed: record.round_count(),
            error: Some(error),
            record,
        }
    }
}

/// Simulation harness
#[derive(Debug, Clone, Default)]
pub struct SimHarness {
    config: SimConfig,
}

impl SimHarness {
    /// Create a new simulation harness
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The scenario this harness runs
    #[must_use]
    pub fn scenario(&self) -> Scenario {
        self.config.model.generate(&self.config.seed)
    }

    /// Run the simulation
    #[must_use]
    pub fn run(&self) -> SimResult {
        let mut record = SimRecord::new(self.config.seed.clone());
        match self.run_into(&mut record) {
            Ok(()) => {
                info!(seed = %self.config.seed, rounds = record.round_count(), "simulation passed");
                SimResult::success(record)
            }
            Err(err) => {
                info!(seed = %self.config.seed, %err, "simulation failed");
                SimResult::failure(record, err.to_string())
            }
        }
    }

    fn run_into(&self, record: &mut SimRecord) -> SimOutcome<()> {
        let scenario = self.scenario();
        let mut repeat = self.repeat(self.sliced()).in_round(0)?;
        let mut items = Vec::new();

        for (round_index, round) in scenario.rounds.iter().enumerate() {
            round.apply(&mut items);
            repeat.synchronize(items.clone()).in_round(round_index)?;

            let (frames, outcome) = match round.interruption {
                Interruption::None => (deliver(&mut repeat, None).in_round(round_index)?, RoundOutcome::Completed),
                Interruption::Restart { after_frames } => {
                    let frames = deliver(&mut repeat, Some(after_frames)).in_round(round_index)?;
                    if repeat.is_synchronizing() {
                        (frames, RoundOutcome::Superseded)
                    } else {
                        (frames, RoundOutcome::Completed)
                    }
                }
                Interruption::Abort { after_frames } => {
                    let frames = deliver(&mut repeat, Some(after_frames)).in_round(round_index)?;
                    if repeat.abort().in_round(round_index)? {
                        (frames, RoundOutcome::Aborted)
                    } else {
                        (frames, RoundOutcome::Completed)
                    }
                }
            };

            if outcome == RoundOutcome::Completed {
                self.verify(round_index, &repeat, &items)?;
            }
            debug!(round = round_index, length = items.len(), frames, ?outcome, "round finished");
            record.push(RoundRecord {
                round: round_index,
                length: items.len(),
                frames,
                outcome,
            });
        }

        // settle whatever the last round left behind
        let settle = scenario.rounds.len();
        repeat.synchronize(items.clone()).in_round(settle)?;
        deliver(&mut repeat, None).in_round(settle)?;
        self.verify(settle, &repeat, &items)?;

        record.metrics = repeat.metrics().clone();
        Ok(())
    }

    fn verify(&self, round: usize, repeat: &SimRepeat, items: &[u32]) -> SimOutcome<()> {
        let divergence = |detail: String| SimError::Divergence { round, detail };

        if repeat.is_synchronizing() {
            return Err(divergence("pass still in flight".to_string()));
        }
        let attached = repeat.host().attached_count();
        if attached != items.len() {
            return Err(divergence(format!("attached {}, expected {}", attached, items.len())));
        }
        if repeat.synchronized_count() != items.len() {
            return Err(divergence(format!(
                "synchronized count {}, expected {}",
                repeat.synchronized_count(),
                items.len()
            )));
        }

        let mut tracked: Vec<String> = repeat.identities().map(|identity| identity.to_string()).collect();
        let mut expected: Vec<String> = items.iter().map(u32::to_string).collect();
        tracked.sort_unstable();
        expected.sort_unstable();
        if tracked != expected {
            return Err(divergence("tracked identities differ from the list".to_string()));
        }

        let mut reference = self.repeat(SyncMode::Immediate).in_round(round)?;
        reference.synchronize(items.to_vec()).in_round(round)?;
        if repeat.host().bindings() != reference.host().bindings() {
            return Err(divergence("bindings differ from a fresh rendering".to_string()));
        }
        Ok(())
    }

    fn sliced(&self) -> SyncMode {
        let slice = Duration::from_millis(self.config.slice_ms);
        SyncMode::Incremental {
            initial_slice: slice,
            resume_slice: slice,
        }
    }

    fn repeat(&self, mode: SyncMode) -> CoreResult<SimRepeat> {
        let config = RepeatConfig::builder()
            .with_selector(IdentitySelector::display())
            .with_element_recycling(self.config.element_recycling)
            .with_mode(mode)
            .build()?;
        let clock = ManualClock::new().with_auto_advance(Duration::from_millis(self.config.step_cost_ms));
        Ok(IndexedRepeat::with_scheduler(config, MemoryHost::new(), clock, FrameQueue::new()))
    }
}

/// Deliver queued frames until the pass completes or `limit` frames were
/// delivered
fn deliver(repeat: &mut SimRepeat, limit: Option<u32>) -> CoreResult<u32> {
    let mut delivered = 0;
    while limit.is_none_or(|limit| delivered < limit) {
        let Some(ticket) = repeat.frames_mut().pop() else {
            break;
        };
        delivered += 1;
        if repeat.on_animation_frame(ticket)?.is_complete() {
            break;
        }
    }
    Ok(delivered)
}

//! indexed-repeat Deterministic Simulation
//!
//! Seeded edit scripts run through an incremental repeat under random
//! restarts and aborts, checked against from-scratch renderings.
//! All simulations are reproducible from a seed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod harness;
pub mod record;
pub mod scenario;
pub mod seed;

pub use error::{SimError, SimOutcome};
pub use harness::{SimConfig, SimHarness, SimResult};
pub use record::{RoundOutcome, RoundRecord, SimRecord};
pub use scenario::{Edit, Interruption, Round, Scenario, ScenarioModel};
pub use seed::SimSeed;

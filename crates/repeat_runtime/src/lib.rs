//! indexed-repeat Runtime
//!
//! Keyed list reconciliation over a retained container: the synchronizer
//! engine, its slice scheduler and the repeat facade hosts talk to.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod engine;
pub mod host;
pub mod memory;
pub mod monitor;
pub mod repeat;
pub mod scheduler;

pub use driver::drive_frames;
pub use engine::{Entry, Phase, StepOutcome, Synchronizer};
pub use host::{Cursor, Position, ViewHost, ViewNode};
pub use memory::{MemoryHost, MemoryNode};
pub use monitor::SyncMetrics;
pub use repeat::{IndexedRepeat, RepeatConfig, RepeatConfigBuilder, SyncProgress, SyncReport, SyncStatus};
pub use scheduler::{FrameQueue, FrameScheduler, FrameTicket, Scheduler, Slice, SliceOutcome};

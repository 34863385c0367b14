//! Indexed repeat.
//!
//! [`IndexedRepeat`] ties a [`Synchronizer`] to a host and a [`Scheduler`]:
//! `synchronize` starts (or restarts) a pass, frames delivered through
//! `on_animation_frame` resume it, `abort` cancels it.

use crate::engine::{Phase, Synchronizer};
use crate::host::ViewHost;
use crate::monitor::SyncMetrics;
use crate::scheduler::{FrameQueue, FrameScheduler, FrameTicket, Scheduler, Slice, SliceOutcome};
use repeat_core::{
    Clock, CoreError, CoreResult, Identity, IdentitySelector, ItemAccessor, RepeatOptions,
    SlotNames, SyncMode, SystemClock,
};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Progress snapshot handed to the deviation callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    /// Length of the sequence being synchronized
    pub length: usize,
    /// Phase the pass was suspended in
    pub phase: Phase,
    /// Nodes attached to the range so far
    pub synchronized_count: usize,
    /// Slices run so far in this pass
    pub slices: u32,
}

/// Summary handed to the synchronization callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Length of the synchronized sequence
    pub length: usize,
    /// Slices the pass took
    pub slices: u32,
}

/// Outcome of a call that may run synchronization work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// The pass finished
    Complete,
    /// The pass continues on the given frame
    Deferred(FrameTicket),
    /// Nothing was run: the frame was stale
    Ignored,
}

impl SyncStatus {
    /// Check if the pass finished in this call
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

type DeviationCallback = Box<dyn FnMut(&SyncProgress)>;
type SynchronizationCallback = Box<dyn FnMut(&SyncReport)>;

/// Configuration of an indexed repeat
pub struct RepeatConfig<T> {
    selector: IdentitySelector<T>,
    names: SlotNames,
    allow_element_recycling: bool,
    mode: SyncMode,
    on_deviation: Option<DeviationCallback>,
    on_synchronization: Option<SynchronizationCallback>,
}

impl<T> RepeatConfig<T> {
    /// Start building a configuration
    #[must_use]
    pub fn builder() -> RepeatConfigBuilder<T> {
        RepeatConfigBuilder::new()
    }

    /// Identity selector
    #[must_use]
    pub fn selector(&self) -> &IdentitySelector<T> {
        &self.selector
    }

    /// Slot names
    #[must_use]
    pub fn slot_names(&self) -> &SlotNames {
        &self.names
    }

    /// Whether removed nodes are reused
    #[must_use]
    pub fn allow_element_recycling(&self) -> bool {
        self.allow_element_recycling
    }

    /// Execution mode
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.mode
    }
}

impl RepeatConfig<Value> {
    /// Configuration for JSON items described by an options map
    ///
    /// The identity selector is the named field of each item.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOption` for bad variable names and
    /// `MissingIdentitySelector` if no selector field is named
    pub fn from_options(options: &RepeatOptions) -> CoreResult<Self> {
        options.validate()?;
        let mut builder = Self::builder()
            .with_slot_names(options.slot_names())
            .with_element_recycling(options.allow_element_recycling)
            .with_mode(options.sync_mode());
        if let Some(field) = &options.identity_selector {
            builder = builder.with_selector(IdentitySelector::field(field.clone()));
        }
        builder.build()
    }
}

impl<T> fmt::Debug for RepeatConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatConfig")
            .field("selector", &self.selector)
            .field("names", &self.names)
            .field("allow_element_recycling", &self.allow_element_recycling)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RepeatConfig`]
pub struct RepeatConfigBuilder<T> {
    selector: Option<IdentitySelector<T>>,
    names: SlotNames,
    allow_element_recycling: bool,
    mode: SyncMode,
    on_deviation: Option<DeviationCallback>,
    on_synchronization: Option<SynchronizationCallback>,
}

impl<T> RepeatConfigBuilder<T> {
    /// Create a builder with default options and no selector
    #[must_use]
    pub fn new() -> Self {
        Self {
            selector: None,
            names: SlotNames::default(),
            allow_element_recycling: true,
            mode: SyncMode::Immediate,
            on_deviation: None,
            on_synchronization: None,
        }
    }

    /// Set the identity selector
    #[must_use]
    pub fn with_selector(mut self, selector: IdentitySelector<T>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Set both slot names
    #[must_use]
    pub fn with_slot_names(mut self, names: SlotNames) -> Self {
        self.names = names;
        self
    }

    /// Set the template name of the item slot
    #[must_use]
    pub fn with_item_variable_name(mut self, name: impl Into<String>) -> Self {
        self.names.item = name.into();
        self
    }

    /// Set the template name of the index slot
    #[must_use]
    pub fn with_index_variable_name(mut self, name: impl Into<String>) -> Self {
        self.names.index = name.into();
        self
    }

    /// Allow or forbid reusing removed nodes
    #[must_use]
    pub fn with_element_recycling(mut self, allow: bool) -> Self {
        self.allow_element_recycling = allow;
        self
    }

    /// Set the execution mode
    #[must_use]
    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Callback for every slice that runs out of budget
    #[must_use]
    pub fn on_deviation(mut self, callback: impl FnMut(&SyncProgress) + 'static) -> Self {
        self.on_deviation = Some(Box::new(callback));
        self
    }

    /// Callback for every completed pass
    #[must_use]
    pub fn on_synchronization(mut self, callback: impl FnMut(&SyncReport) + 'static) -> Self {
        self.on_synchronization = Some(Box::new(callback));
        self
    }

    /// Finish the configuration
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentitySelector` without a selector, or
    /// `InvalidOption` for bad slot names
    pub fn build(self) -> CoreResult<RepeatConfig<T>> {
        let selector = self.selector.ok_or(CoreError::MissingIdentitySelector)?;
        self.names.validate()?;
        Ok(RepeatConfig {
            selector,
            names: self.names,
            allow_element_recycling: self.allow_element_recycling,
            mode: self.mode,
            on_deviation: self.on_deviation,
            on_synchronization: self.on_synchronization,
        })
    }
}

impl<T> Default for RepeatConfigBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyed list binding over a retained container
pub struct IndexedRepeat<T, H: ViewHost<T>, C = SystemClock, F = FrameQueue> {
    host: H,
    engine: Synchronizer<T, H::Node>,
    scheduler: Scheduler<C, F>,
    on_deviation: Option<DeviationCallback>,
    on_synchronization: Option<SynchronizationCallback>,
    length: usize,
    slices: u32,
}

impl<T: Clone, H: ViewHost<T>> IndexedRepeat<T, H> {
    /// Create a repeat on the wall clock with a queued frame source
    #[must_use]
    pub fn new(config: RepeatConfig<T>, host: H) -> Self {
        Self::with_scheduler(config, host, SystemClock::new(), FrameQueue::new())
    }
}

impl<T, H, C, F> IndexedRepeat<T, H, C, F>
where
    T: Clone,
    H: ViewHost<T>,
    C: Clock,
    F: FrameScheduler,
{
    /// Create a repeat with an explicit clock and frame source
    #[must_use]
    pub fn with_scheduler(config: RepeatConfig<T>, host: H, clock: C, frames: F) -> Self {
        let RepeatConfig {
            selector,
            names,
            allow_element_recycling,
            mode,
            on_deviation,
            on_synchronization,
        } = config;
        Self {
            host,
            engine: Synchronizer::new(selector, names, allow_element_recycling),
            scheduler: Scheduler::new(clock, frames, mode),
            on_deviation,
            on_synchronization,
            length: 0,
            slices: 0,
        }
    }

    /// Reconcile the container with `items`
    ///
    /// A pass in flight is cancelled first. In incremental mode the pass may
    /// be left running behind a frame request.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` or a selector error before anything is
    /// touched, or the error of a failed step (the pass is aborted)
    pub fn synchronize(&mut self, items: impl Into<ItemAccessor<T>>) -> CoreResult<SyncStatus> {
        let items = items.into();
        let length = items.length();

        if let Err(err) = self.engine.begin(items) {
            if !self.engine.is_synchronizing() {
                self.scheduler.cancel();
            }
            return Err(err);
        }
        self.scheduler.cancel();
        self.length = length;
        self.slices = 0;
        self.run(Slice::Initial)
    }

    /// Resume the parked pass on a delivered frame
    ///
    /// # Errors
    ///
    /// Returns the error of a failed step (the pass is aborted)
    pub fn on_animation_frame(&mut self, ticket: FrameTicket) -> CoreResult<SyncStatus> {
        if !self.scheduler.claim(ticket) {
            warn!(%ticket, pending = ?self.scheduler.pending_frame(), "ignoring stale frame");
            return Ok(SyncStatus::Ignored);
        }
        if !self.engine.is_synchronizing() {
            return Ok(SyncStatus::Ignored);
        }
        self.run(Slice::Resume)
    }

    /// Cancel the pass in flight
    ///
    /// Returns whether a pass was cancelled; calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the error of reabsorbing collected carcasses
    pub fn abort(&mut self) -> CoreResult<bool> {
        self.scheduler.cancel();
        self.engine.abort()
    }

    fn run(&mut self, slice: Slice) -> CoreResult<SyncStatus> {
        self.slices += 1;
        match self.scheduler.run_slice(&mut self.engine, &mut self.host, slice)? {
            SliceOutcome::Complete => {
                let report = SyncReport {
                    length: self.length,
                    slices: self.slices,
                };
                debug!(length = report.length, slices = report.slices, "synchronized");
                if let Some(callback) = self.on_synchronization.as_mut() {
                    callback(&report);
                }
                Ok(SyncStatus::Complete)
            }
            SliceOutcome::Exhausted => {
                let phase = self
                    .engine
                    .phase()
                    .ok_or_else(|| CoreError::internal("exhausted slice left no pass behind"))?;
                let progress = SyncProgress {
                    length: self.length,
                    phase,
                    synchronized_count: self.engine.synchronized_count(),
                    slices: self.slices,
                };
                if let Some(callback) = self.on_deviation.as_mut() {
                    callback(&progress);
                }
                let ticket = self.scheduler.defer();
                debug!(%ticket, ?phase, "synchronization deferred");
                Ok(SyncStatus::Deferred(ticket))
            }
        }
    }
}

impl<T, H, C, F> IndexedRepeat<T, H, C, F>
where
    H: ViewHost<T>,
{
    /// The container
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable container access
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Check if a pass is in flight
    #[must_use]
    pub fn is_synchronizing(&self) -> bool {
        self.engine.is_synchronizing()
    }

    /// Nodes attached to the synchronized range
    #[must_use]
    pub fn synchronized_count(&self) -> usize {
        self.engine.synchronized_count()
    }

    /// Node tracked for `identity`
    #[must_use]
    pub fn node_for(&self, identity: &str) -> Option<&H::Node> {
        self.engine.node_for(identity)
    }

    /// Tracked identities
    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.engine.identities()
    }

    /// Counters accumulated so far
    #[must_use]
    pub fn metrics(&self) -> &SyncMetrics {
        self.engine.metrics()
    }

    /// Phase of the pass in flight
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        self.engine.phase()
    }

    /// Frame request the parked pass waits on
    #[must_use]
    pub fn pending_frame(&self) -> Option<FrameTicket> {
        self.scheduler.pending_frame()
    }

    /// The frame source
    #[must_use]
    pub fn frames(&self) -> &F {
        self.scheduler.frames()
    }

    /// Mutable frame source
    pub fn frames_mut(&mut self) -> &mut F {
        self.scheduler.frames_mut()
    }
}

impl<H, C, F> IndexedRepeat<Value, H, C, F>
where
    H: ViewHost<Value>,
    C: Clock,
    F: FrameScheduler,
{
    /// Reconcile with a dynamic JSON source
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInputKind` for values that are neither arrays nor
    /// array-like objects, before anything is touched
    pub fn synchronize_json(&mut self, value: &Value) -> CoreResult<SyncStatus> {
        let items = ItemAccessor::infer(value)?;
        self.synchronize(items)
    }
}

impl<T, H, C, F> fmt::Debug for IndexedRepeat<T, H, C, F>
where
    H: ViewHost<T> + fmt::Debug,
    F: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedRepeat")
            .field("host", &self.host)
            .field("engine", &self.engine)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

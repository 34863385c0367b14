//! Slice scheduler for synchronization passes.
//!
//! The scheduler decides how much of a pass runs per turn:
//! - Immediate mode runs every step inside the triggering call
//! - Incremental mode runs steps until the slice deadline has passed, then
//!   parks the pass behind an animation frame request
//!
//! Deadlines are checked after each step, so a slice always makes progress.

use crate::engine::{StepOutcome, Synchronizer};
use crate::host::{ViewHost, ViewNode};
use repeat_core::{Clock, CoreResult, SyncMode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

/// Handle to a requested animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameTicket(u64);

impl FrameTicket {
    /// Create a ticket from a raw number
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw ticket number
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Source of animation frames
///
/// The host delivers a requested frame by calling back into the repeat with
/// the ticket it was handed here.
pub trait FrameScheduler {
    /// Ask for a callback at the next animation opportunity
    fn request_frame(&mut self) -> FrameTicket;

    /// Withdraw a request; a cancelled ticket must not be delivered
    fn cancel_frame(&mut self, ticket: FrameTicket);
}

/// Frame scheduler that queues requests for the caller to deliver
#[derive(Debug, Default, Clone)]
pub struct FrameQueue {
    next: u64,
    pending: VecDeque<FrameTicket>,
    requested: u64,
    cancelled: u64,
}

impl FrameQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest pending request
    pub fn pop(&mut self) -> Option<FrameTicket> {
        self.pending.pop_front()
    }

    /// Oldest pending request, left in the queue
    #[must_use]
    pub fn peek(&self) -> Option<FrameTicket> {
        self.pending.front().copied()
    }

    /// Number of requests waiting for delivery
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing waits for delivery
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total requests made
    #[must_use]
    pub fn requested_count(&self) -> u64 {
        self.requested
    }

    /// Total requests withdrawn
    #[must_use]
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameTicket {
        let ticket = FrameTicket(self.next);
        self.next += 1;
        self.requested += 1;
        self.pending.push_back(ticket);
        ticket
    }

    fn cancel_frame(&mut self, ticket: FrameTicket) {
        let before = self.pending.len();
        self.pending.retain(|pending| *pending != ticket);
        if self.pending.len() < before {
            self.cancelled += 1;
        }
    }
}

/// Which budget a slice runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    /// Slice run inside the triggering call
    Initial,
    /// Slice run on a delivered frame
    Resume,
}

/// How a slice ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// The pass finished
    Complete,
    /// The deadline passed with work remaining
    Exhausted,
}

/// Runs synchronization passes in slices
pub struct Scheduler<C, F> {
    clock: C,
    frames: F,
    mode: SyncMode,
    pending: Option<FrameTicket>,
}

impl<C, F> Scheduler<C, F> {
    /// Create a scheduler
    #[must_use]
    pub fn new(clock: C, frames: F, mode: SyncMode) -> Self {
        Self {
            clock,
            frames,
            mode,
            pending: None,
        }
    }

    /// Execution mode
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Frame request the parked pass waits on
    #[must_use]
    pub fn pending_frame(&self) -> Option<FrameTicket> {
        self.pending
    }

    /// The clock slices are measured with
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The frame source
    #[must_use]
    pub fn frames(&self) -> &F {
        &self.frames
    }

    /// Mutable frame source, for hosts that deliver frames themselves
    pub fn frames_mut(&mut self) -> &mut F {
        &mut self.frames
    }

    /// Budget of a slice, `None` when passes are not sliced
    #[must_use]
    pub fn budget(&self, slice: Slice) -> Option<Duration> {
        match (self.mode, slice) {
            (SyncMode::Immediate, _) => None,
            (SyncMode::Incremental { initial_slice, .. }, Slice::Initial) => Some(initial_slice),
            (SyncMode::Incremental { resume_slice, .. }, Slice::Resume) => Some(resume_slice),
        }
    }
}

impl<C: Clock, F: FrameScheduler> Scheduler<C, F> {
    /// Run steps of the pass in flight until it finishes or the slice
    /// budget is spent
    ///
    /// # Errors
    ///
    /// Returns the failing step's error; the engine has already aborted the
    /// pass by then
    pub fn run_slice<T, N, H>(
        &mut self,
        engine: &mut Synchronizer<T, N>,
        host: &mut H,
        slice: Slice,
    ) -> CoreResult<SliceOutcome>
    where
        T: Clone,
        N: ViewNode<T>,
        H: ViewHost<T, Node = N>,
    {
        let Some(budget) = self.budget(slice) else {
            engine.run_to_completion(host)?;
            return Ok(SliceOutcome::Complete);
        };

        let deadline = self.clock.now() + budget;
        let mut steps = 0u64;
        loop {
            if engine.step(host)? == StepOutcome::Done {
                trace!(steps, "slice finished the pass");
                return Ok(SliceOutcome::Complete);
            }
            steps += 1;
            if self.clock.now() > deadline {
                engine.metrics_mut().record_deviation();
                debug!(steps, budget_ms = budget.as_millis() as u64, "slice budget exhausted");
                return Ok(SliceOutcome::Exhausted);
            }
        }
    }

    /// Park the pass behind a new frame request
    pub fn defer(&mut self) -> FrameTicket {
        let ticket = self.frames.request_frame();
        self.pending = Some(ticket);
        ticket
    }

    /// Accept a delivered frame
    ///
    /// Returns `false` for tickets that are not the pending request.
    pub fn claim(&mut self, ticket: FrameTicket) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Withdraw the pending frame request, if any
    pub fn cancel(&mut self) -> Option<FrameTicket> {
        let ticket = self.pending.take()?;
        self.frames.cancel_frame(ticket);
        trace!(%ticket, "frame request cancelled");
        Some(ticket)
    }
}

impl<C, F: fmt::Debug> fmt::Debug for Scheduler<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("mode", &self.mode)
            .field("pending", &self.pending)
            .field("frames", &self.frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryHost, MemoryNode};
    use repeat_core::{IdentitySelector, ItemAccessor, ManualClock, SlotNames};

    fn engine() -> Synchronizer<u32, MemoryNode<u32>> {
        Synchronizer::new(IdentitySelector::display(), SlotNames::default(), true)
    }

    fn incremental(initial: u64, resume: u64) -> SyncMode {
        SyncMode::Incremental {
            initial_slice: Duration::from_millis(initial),
            resume_slice: Duration::from_millis(resume),
        }
    }

    #[test]
    fn test_frame_queue() {
        let mut queue = FrameQueue::new();
        let first = queue.request_frame();
        let second = queue.request_frame();
        assert_ne!(first, second);
        assert_eq!(queue.len(), 2);

        queue.cancel_frame(first);
        assert_eq!(queue.cancelled_count(), 1);
        assert_eq!(queue.peek(), Some(second));
        assert_eq!(queue.pop(), Some(second));
        assert!(queue.is_empty());

        queue.cancel_frame(first);
        assert_eq!(queue.cancelled_count(), 1);
        assert_eq!(queue.requested_count(), 2);
    }

    #[test]
    fn test_ticket_display() {
        assert_eq!(FrameTicket::new(7).to_string(), "frame#7");
        assert_eq!(FrameTicket::new(7).as_u64(), 7);
    }

    #[test]
    fn test_accessors_need_no_clock() {
        // plain accessors stay usable on schedulers without a real clock
        let mut scheduler = Scheduler::new((), FrameQueue::new(), SyncMode::Immediate);
        assert_eq!(scheduler.mode(), SyncMode::Immediate);
        assert_eq!(scheduler.pending_frame(), None);
        assert!(scheduler.frames().is_empty());
        scheduler.frames_mut().request_frame();
        assert_eq!(scheduler.frames().len(), 1);
        assert_eq!(scheduler.budget(Slice::Resume), None);
    }

    #[test]
    fn test_budget_per_mode() {
        let immediate = Scheduler::new(ManualClock::new(), FrameQueue::new(), SyncMode::Immediate);
        assert_eq!(immediate.budget(Slice::Initial), None);

        let sliced = Scheduler::new(ManualClock::new(), FrameQueue::new(), SyncMode::incremental());
        assert_eq!(sliced.budget(Slice::Initial), Some(Duration::from_millis(15)));
        assert_eq!(sliced.budget(Slice::Resume), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_immediate_runs_to_completion() {
        let mut scheduler = Scheduler::new(ManualClock::new(), FrameQueue::new(), SyncMode::Immediate);
        let mut engine = engine();
        let mut host = MemoryHost::new();
        engine.begin(ItemAccessor::from((0..50).collect::<Vec<u32>>())).unwrap();

        let outcome = scheduler.run_slice(&mut engine, &mut host, Slice::Initial).unwrap();

        assert_eq!(outcome, SliceOutcome::Complete);
        assert_eq!(host.attached_count(), 50);
        assert!(!engine.is_synchronizing());
    }

    #[test]
    fn test_incremental_exhausts_budget() {
        // every clock read costs 1ms
        let clock = ManualClock::new().with_auto_advance(Duration::from_millis(1));
        let mut scheduler = Scheduler::new(clock, FrameQueue::new(), incremental(3, 3));
        let mut engine = engine();
        let mut host = MemoryHost::new();
        engine.begin(ItemAccessor::from((0..20).collect::<Vec<u32>>())).unwrap();

        let outcome = scheduler.run_slice(&mut engine, &mut host, Slice::Initial).unwrap();

        assert_eq!(outcome, SliceOutcome::Exhausted);
        assert!(engine.is_synchronizing());
        assert_eq!(engine.metrics().deviations, 1);

        let ticket = scheduler.defer();
        assert_eq!(scheduler.pending_frame(), Some(ticket));
        assert!(!scheduler.claim(FrameTicket::new(ticket.as_u64() + 1)));
        assert!(scheduler.claim(ticket));
        assert_eq!(scheduler.pending_frame(), None);
    }

    #[test]
    fn test_incremental_finishes_within_budget() {
        let mut scheduler = Scheduler::new(ManualClock::new(), FrameQueue::new(), SyncMode::incremental());
        let mut engine = engine();
        let mut host = MemoryHost::new();
        engine.begin(ItemAccessor::from(vec![1u32, 2, 3])).unwrap();

        let outcome = scheduler.run_slice(&mut engine, &mut host, Slice::Initial).unwrap();

        assert_eq!(outcome, SliceOutcome::Complete);
        assert_eq!(engine.metrics().deviations, 0);
    }

    #[test]
    fn test_cancel_withdraws_request() {
        let mut scheduler = Scheduler::new(ManualClock::new(), FrameQueue::new(), SyncMode::incremental());
        assert_eq!(scheduler.cancel(), None);

        let ticket = scheduler.defer();
        assert_eq!(scheduler.cancel(), Some(ticket));
        assert!(scheduler.frames().is_empty());
        assert_eq!(scheduler.frames().cancelled_count(), 1);
        assert!(!scheduler.claim(ticket));
    }
}

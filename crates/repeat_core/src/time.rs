//! Clocks for slice deadlines.
//!
//! Time is read through [`Clock`] so incremental synchronization can be run
//! against a deterministic clock in tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock {
    /// Elapsed time since the clock's origin
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually driven clock
///
/// Clones share the same time. With an auto-advance step every read moves
/// time forward, which makes "one step costs this much" budgets exact.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    auto_advance: Duration,
}

impl ManualClock {
    /// Create a clock frozen at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time by `step` on every read
    #[must_use]
    pub fn with_auto_advance(mut self, step: Duration) -> Self {
        self.auto_advance = step;
        self
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }

    /// Current time without advancing
    #[must_use]
    pub fn peek(&self) -> Duration {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now.saturating_add(self.auto_advance));
        now
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

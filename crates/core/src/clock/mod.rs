//! Time sources. Everything in the engine asks a [`Clock`] for "now" and
//! never counts ticks, so throttled or skipped callbacks cannot skew a session.

use std::{cell::Cell, rc::Rc, time::Instant};

/// Monotonic millisecond time source.
///
/// Values are measured from an arbitrary epoch and never decrease, but they
/// may jump forward by large amounts (the host slept, the tab was parked).
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock backed source anchored at construction time.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
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
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock used for virtual-time playback and tests.
///
/// Clones share the same underlying time, so a host can keep one handle while
/// the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(now_ms)),
        }
    }

    /// Moves time forward. Requests to move backwards are ignored so the
    /// clock stays monotonic.
    pub fn set(&self, now_ms: u64) {
        if now_ms > self.now.get() {
            self.now.set(now_ms);
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.set(self.now.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

//! Trailing-edge throttle driven by explicit clock ticks.

use std::time::Duration;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

/// Default throttle window in milliseconds.
pub const DEFAULT_THROTTLE_INTERVAL_MS: u64 = 200;

/// Coalesces a stream of values into at most one per interval.
///
/// The first value pushed while idle opens a window. Values pushed inside the
/// window replace the pending one without moving the window's end, so a
/// continuous stream still yields one evaluation per interval. [`poll`]
/// releases the latest value once the window has elapsed.
///
/// [`poll`]: Throttle::poll
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
            deadline: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a raw value.
    pub fn push(&mut self, value: T, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.interval);
        }
        self.pending = Some(value);
    }

    /// Take the pending value if its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

}

impl<T> Default for Throttle<T> {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_THROTTLE_INTERVAL_MS))
    }
}

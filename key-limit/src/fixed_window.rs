use std::ops::ControlFlow;
use std::time::Duration;

use quanta::Clock;
use quanta::Instant;
use tracing::trace;

use super::ConfigError;
use super::Reason;
use super::Strategy;

use crate::store::KeyedStore;

/// A per-key window-based limiter.
///
/// Divides time into fixed intervals per key. It is the cheapest strategy
/// but is susceptible to "boundary bursts" where double the limit is
/// admitted in a short period spanning two windows.
#[derive(Debug)]
pub struct FixedWindow {
    limit: usize,
    window_ns: u64,
    windows: KeyedStore<Window>,
    clock: Clock,
    anchor: Instant,
}

#[derive(Debug)]
struct Window {
    count: usize,
    /// Nanos from the anchor at which this window closes.
    window_end: u64,
}

impl Strategy for FixedWindow {
    fn allow(&self, key: &str) -> ControlFlow<Reason> {
        let entry = self.windows.entry(key, || Window {
            count: 0,
            window_end: self.now_ns() + self.window_ns,
        });
        let mut window = entry.lock().unwrap();
        let now = self.now_ns();

        if now >= window.window_end {
            window.count = 0;
            window.window_end = now + self.window_ns;
        }

        if window.count >= self.limit {
            trace!(key, "fixed window exhausted");
            return ControlFlow::Break(Reason::Overloaded {
                retry_after: Duration::from_nanos(window.window_end - now),
            });
        }

        window.count += 1;
        ControlFlow::Continue(())
    }
}

impl FixedWindow {
    /// Creates a new `FixedWindow` strategy.
    ///
    /// # Arguments
    ///
    /// * `limit` - The maximum number of requests admitted per key within a
    ///   single window.
    /// * `window` - The duration of the fixed time window.
    ///
    /// # Errors
    ///
    /// Rejects a zero `limit` or a zero `window`.
    pub fn new(limit: usize, window: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(limit, window, Clock::new())
    }

    /// As [`FixedWindow::new`], with an injected clock. Pair with
    /// `quanta::Clock::mock()` to drive time in tests.
    pub fn with_clock(limit: usize, window: Duration, clock: Clock) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }

        let anchor = clock.now();
        Ok(FixedWindow {
            limit,
            window_ns: window.as_nanos() as u64,
            windows: KeyedStore::new(),
            clock,
            anchor,
        })
    }

    fn now_ns(&self) -> u64 {
        self.clock.now().duration_since(self.anchor).as_nanos() as u64
    }
}

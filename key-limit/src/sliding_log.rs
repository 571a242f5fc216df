use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::time::Duration;

use quanta::Clock;
use quanta::Instant;
use tracing::trace;

use super::ConfigError;
use super::Reason;
use super::Strategy;

use crate::store::KeyedStore;

/// A per-key sliding window log.
///
/// Keeps the timestamp of every admitted request and trims those older than
/// the trailing window before each decision. This gives an exact guarantee:
/// no trailing interval of the window's length ever contains more than
/// `limit` admissions for a key. Memory grows with admission rate times
/// window length per key, the price of exactness.
#[derive(Debug)]
pub struct SlidingLog {
    limit: usize,
    window_ns: u64,
    logs: KeyedStore<VecDeque<u64>>,
    clock: Clock,
    anchor: Instant,
}

impl Strategy for SlidingLog {
    fn allow(&self, key: &str) -> ControlFlow<Reason> {
        let entry = self.logs.entry(key, VecDeque::new);
        let mut log = entry.lock().unwrap();
        let now = self.now_ns();

        // The log is ascending, so expiry is a prefix trim. A timestamp
        // exactly at the cutoff is still inside the window.
        let cutoff = now.saturating_sub(self.window_ns);
        while log.front().is_some_and(|&ts| ts < cutoff) {
            log.pop_front();
        }

        if log.len() >= self.limit {
            trace!(key, "sliding log full");
            // The oldest retained admission ages out at ts + window.
            let retry_after = log
                .front()
                .map(|&ts| Duration::from_nanos((ts + self.window_ns).saturating_sub(now)))
                .unwrap_or_default();
            return ControlFlow::Break(Reason::Overloaded { retry_after });
        }

        log.push_back(now);
        ControlFlow::Continue(())
    }
}

impl SlidingLog {
    /// Creates a new `SlidingLog` strategy.
    ///
    /// # Arguments
    ///
    /// * `limit` - The maximum number of admissions per key within any
    ///   trailing `window`.
    /// * `window` - The length of the trailing window.
    ///
    /// # Errors
    ///
    /// Rejects a zero `limit` or a zero `window`.
    pub fn new(limit: usize, window: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(limit, window, Clock::new())
    }

    /// As [`SlidingLog::new`], with an injected clock.
    pub fn with_clock(limit: usize, window: Duration, clock: Clock) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }

        let anchor = clock.now();
        Ok(SlidingLog {
            limit,
            window_ns: window.as_nanos() as u64,
            logs: KeyedStore::new(),
            clock,
            anchor,
        })
    }

    fn now_ns(&self) -> u64 {
        self.clock.now().duration_since(self.anchor).as_nanos() as u64
    }

    #[cfg(test)]
    fn log_len(&self, key: &str) -> usize {
        self.logs.entry(key, VecDeque::new).lock().unwrap().len()
    }
}

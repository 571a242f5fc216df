use std::ops::ControlFlow;
use std::time::Duration;

use quanta::Clock;
use quanta::Instant;
use tracing::trace;

use super::ConfigError;
use super::Reason;
use super::Strategy;

use crate::decay::accrued_units;
use crate::store::KeyedStore;

/// A per-key leaky bucket.
///
/// Each admitted request occupies one slot in the key's bucket; slots drain
/// at a fixed rate. A full bucket denies until enough has leaked. Whole
/// units only: fractional leakage within a call is truncated away, so very
/// frequent calls drain slower than the nominal rate.
#[derive(Debug)]
pub struct LeakyBucket {
    capacity: usize,
    leak_rate: f64,
    buckets: KeyedStore<Bucket>,
    clock: Clock,
    anchor: Instant,
}

#[derive(Debug)]
struct Bucket {
    queued: usize,
    /// Nanos from the anchor of the last leak accounting.
    last_leak_at: u64,
}

impl Strategy for LeakyBucket {
    fn allow(&self, key: &str) -> ControlFlow<Reason> {
        let entry = self.buckets.entry(key, || Bucket {
            queued: 0,
            last_leak_at: self.now_ns(),
        });
        let mut bucket = entry.lock().unwrap();
        let now = self.now_ns();

        let elapsed = Duration::from_nanos(now.saturating_sub(bucket.last_leak_at));
        let leaked = accrued_units(elapsed, self.leak_rate);
        bucket.queued = bucket.queued.saturating_sub(leaked);
        bucket.last_leak_at = now;

        if bucket.queued >= self.capacity {
            trace!(key, "leaky bucket full");
            // One unit's drain time; saturate rather than panic on
            // pathologically slow rates.
            let retry_after =
                Duration::try_from_secs_f64(1.0 / self.leak_rate).unwrap_or(Duration::MAX);
            return ControlFlow::Break(Reason::Overloaded { retry_after });
        }

        bucket.queued += 1;
        ControlFlow::Continue(())
    }
}

impl LeakyBucket {
    /// Creates a new `LeakyBucket` strategy.
    ///
    /// # Arguments
    ///
    /// * `capacity` - How many admitted requests a key's bucket holds.
    /// * `leak_rate` - Units drained per second.
    ///
    /// # Errors
    ///
    /// Rejects a zero `capacity` and a `leak_rate` that is not positive and
    /// finite.
    pub fn new(capacity: usize, leak_rate: f64) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, leak_rate, Clock::new())
    }

    /// As [`LeakyBucket::new`], with an injected clock.
    pub fn with_clock(capacity: usize, leak_rate: f64, clock: Clock) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(leak_rate.is_finite() && leak_rate > 0.0) {
            return Err(ConfigError::InvalidRate(leak_rate));
        }

        let anchor = clock.now();
        Ok(LeakyBucket {
            capacity,
            leak_rate,
            buckets: KeyedStore::new(),
            clock,
            anchor,
        })
    }

    fn now_ns(&self) -> u64 {
        self.clock.now().duration_since(self.anchor).as_nanos() as u64
    }
}

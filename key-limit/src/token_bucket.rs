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

/// A per-key token bucket.
///
/// Each key's bucket starts full and refills at a fixed rate; every
/// admission spends one token. The structural dual of [`LeakyBucket`]
/// (fill-to-empty rather than drain-from-full) with the same whole-unit
/// truncation: fractional refill within a call is discarded.
///
/// [`LeakyBucket`]: crate::LeakyBucket
#[derive(Debug)]
pub struct TokenBucket {
    capacity: usize,
    refill_rate: f64,
    buckets: KeyedStore<Bucket>,
    clock: Clock,
    anchor: Instant,
}

#[derive(Debug)]
struct Bucket {
    tokens: usize,
    /// Nanos from the anchor of the last refill accounting.
    last_refill_at: u64,
}

impl Strategy for TokenBucket {
    fn allow(&self, key: &str) -> ControlFlow<Reason> {
        let entry = self.buckets.entry(key, || Bucket {
            tokens: self.capacity,
            last_refill_at: self.now_ns(),
        });
        let mut bucket = entry.lock().unwrap();
        let now = self.now_ns();

        let elapsed = Duration::from_nanos(now.saturating_sub(bucket.last_refill_at));
        let refilled = accrued_units(elapsed, self.refill_rate);
        bucket.tokens = bucket.tokens.saturating_add(refilled).min(self.capacity);
        bucket.last_refill_at = now;

        if bucket.tokens == 0 {
            trace!(key, "token bucket empty");
            // One token's refill time; saturate rather than panic on
            // pathologically slow rates.
            let retry_after =
                Duration::try_from_secs_f64(1.0 / self.refill_rate).unwrap_or(Duration::MAX);
            return ControlFlow::Break(Reason::Overloaded { retry_after });
        }

        bucket.tokens -= 1;
        ControlFlow::Continue(())
    }
}

impl TokenBucket {
    /// Creates a new `TokenBucket` strategy.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The maximum number of tokens a key's bucket holds; a
    ///   fresh key starts with this many.
    /// * `refill_rate` - Tokens added per second.
    ///
    /// # Errors
    ///
    /// Rejects a zero `capacity` and a `refill_rate` that is not positive
    /// and finite.
    pub fn new(capacity: usize, refill_rate: f64) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, refill_rate, Clock::new())
    }

    /// As [`TokenBucket::new`], with an injected clock.
    pub fn with_clock(
        capacity: usize,
        refill_rate: f64,
        clock: Clock,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(refill_rate.is_finite() && refill_rate > 0.0) {
            return Err(ConfigError::InvalidRate(refill_rate));
        }

        let anchor = clock.now();
        Ok(TokenBucket {
            capacity,
            refill_rate,
            buckets: KeyedStore::new(),
            clock,
            anchor,
        })
    }

    fn now_ns(&self) -> u64 {
        self.clock.now().duration_since(self.anchor).as_nanos() as u64
    }
}

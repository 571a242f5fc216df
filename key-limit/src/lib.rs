//! # key-limit
//!
//! `key-limit` provides per-key admission control: each caller key (a client
//! id, an IP, an API token) gets its own quota state, created lazily on first
//! sight and updated under its own lock.
//!
//! ## Core Philosophy
//!
//! A single global limiter serializes unrelated callers against each other.
//! `key-limit` partitions state by key behind a two-level locking scheme: a
//! coarse lock guards the key map's structure, and each key's record carries
//! its own lock for the decay-and-decide arithmetic. Unrelated keys proceed
//! fully in parallel; calls for one key serialize.
//!
//! ## Key Concepts
//!
//! * **Keyed State**: one record per key, owned by the strategy instance for
//!   its lifetime. Records are never evicted, so pick a key with bounded
//!   cardinality (client id, not request id).
//! * **Lazy Evaluation**: windows drain, buckets refill and leak at the moment
//!   of the request. No background workers or timers.
//! * **Strategy Trait**: a unified interface for different limiting
//!   algorithms, selected at construction time.
//! * **Injectable Clock**: every strategy accepts a `quanta::Clock`, so tests
//!   drive synthetic time with `Clock::mock()`.
//!
//! ## Example
//!
//! ```rust
//! use key_limit::Strategy;
//! use key_limit::TokenBucket;
//!
//! // 100-token buckets per key, refilling 10 tokens/second
//! let bucket = TokenBucket::new(100, 10.0).unwrap();
//!
//! if bucket.allow("client-7").is_continue() {
//!     // Request admitted
//! }
//! ```

use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;

mod decay;
mod fixed_window;
mod leaky_bucket;
mod sliding_log;
mod store;
mod token_bucket;

pub use fixed_window::FixedWindow;
pub use leaky_bucket::LeakyBucket;
pub use sliding_log::SlidingLog;
pub use token_bucket::TokenBucket;

/// Reasons why a request might be rejected by a strategy.
#[derive(Debug, PartialEq)]
pub enum Reason {
    Overloaded { retry_after: Duration },
}

/// Rejected configuration at construction time.
///
/// `allow` itself never fails; the only error surface is a constructor
/// handed parameters that make the algorithm's arithmetic meaningless.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The request limit must admit at least one request per window.
    #[error("limit must be at least 1")]
    ZeroLimit,

    /// Bucket capacity must hold at least one unit.
    #[error("capacity must be at least 1")]
    ZeroCapacity,

    /// A zero-length window makes every request fall outside it.
    #[error("window duration must be non-zero")]
    ZeroWindow,

    /// Rates are units per second and must be positive and finite.
    #[error("rate must be a positive finite number, got {0}")]
    InvalidRate(f64),
}

/// The core trait for all keyed rate-limiting algorithms.
///
/// Strategies must be `Send` and `Sync` to allow sharing across thread
/// boundaries via `Arc`.
pub trait Strategy: Debug {
    /// Decides whether the request identified by `key` may proceed.
    ///
    /// `Continue` admits the request and records its consumption against the
    /// key's quota. `Break` denies it and leaves the key's countable state
    /// untouched (time-based decay is still applied). Never blocks beyond
    /// brief per-key lock contention.
    fn allow(&self, key: &str) -> ControlFlow<Reason>;
}

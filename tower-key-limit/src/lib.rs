//! # Tower Key Limit
//!
//! `tower-key-limit` applies per-key rate limiting to a
//! [Tower](https://github.com/tower-rs/tower) service stack, backed by a
//! [`key_limit::Strategy`].
//!
//! ## How it differs from a plain rate-limit layer
//!
//! A key-less limiter can acquire its permit in `poll_ready`, before any
//! request exists. A keyed limiter cannot: the key (client id, IP, API
//! token) lives on the request itself. [`KeyLimitService`] therefore decides
//! at `call` time — it extracts the key, consults the shared strategy, and
//! either forwards the request or resolves immediately with
//! [`KeyLimitError::RateLimited`], carrying the strategy's retry-after hint.
//! There is no queueing: a denied request is the caller's to retry.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use key_limit::FixedWindow;
//! use tower::ServiceBuilder;
//! use tower_key_limit::KeyLimitLayer;
//!
//! let strategy = Arc::new(FixedWindow::new(100, Duration::from_secs(60)).unwrap());
//! let layer = KeyLimitLayer::new(strategy, |req: &String| req.clone());
//!
//! let _stack = ServiceBuilder::new().layer(layer);
//! ```

mod error;
mod layer;
mod service;


pub use error::KeyLimitError;
pub use layer::KeyLimitLayer;
pub use service::KeyLimitService;
pub use service::ResponseFuture;

use std::sync::Arc;

use tower::Layer;

use crate::service::KeyLimitService;

/// Applies per-key rate limiting to requests.
///
/// Holds the shared [`key_limit::Strategy`] and a key-extraction function;
/// every service built from this layer consults the same per-key state.
#[derive(Debug)]
pub struct KeyLimitLayer<L, F>
where
    L: ?Sized,
{
    limiter: Arc<L>,
    key_fn: F,
}

impl<L, F> Clone for KeyLimitLayer<L, F>
where
    L: ?Sized,
    F: Clone,
{
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            key_fn: self.key_fn.clone(),
        }
    }
}

impl<L, F> KeyLimitLayer<L, F>
where
    L: ?Sized,
{
    /// Create a KeyLimitLayer.
    ///
    /// `key_fn` maps each request to the key its quota is tracked under,
    /// e.g. a client identifier pulled from a header. Keys of unbounded
    /// cardinality grow limiter memory without bound; do not key by
    /// request id.
    pub fn new(limiter: Arc<L>, key_fn: F) -> Self {
        KeyLimitLayer { limiter, key_fn }
    }
}

impl<L, F, S> Layer<S> for KeyLimitLayer<L, F>
where
    L: ?Sized,
    F: Clone,
{
    type Service = KeyLimitService<L, S, F>;

    fn layer(&self, service: S) -> Self::Service {
        KeyLimitService::new(service, self.limiter.clone(), self.key_fn.clone())
    }
}

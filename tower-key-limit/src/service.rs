use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use pin_project_lite::pin_project;
use tower::BoxError;
use tower::Service;

use key_limit::Reason;
use key_limit::Strategy;

use crate::error::KeyLimitError;

/// A service that admits or rejects each request against its key's quota.
///
/// The admission decision happens in `call`, once the request (and therefore
/// its key) exists. `poll_ready` only reflects the inner service; readiness
/// never depends on quota state, so a denial for one key cannot stall the
/// whole stack.
#[derive(Debug)]
pub struct KeyLimitService<L, S, F>
where
    L: ?Sized,
{
    inner: S,
    limiter: Arc<L>,
    key_fn: F,
}

pin_project! {
    /// Response future: either the inner service's future or an immediate
    /// rejection for an over-quota key.
    #[project = ResponseFutureProj]
    pub enum ResponseFuture<F> {
        Forwarded { #[pin] future: F },
        Rejected { error: Option<KeyLimitError> },
    }
}

impl<F, T> Future for ResponseFuture<F>
where
    F: Future<Output = Result<T, BoxError>>,
{
    type Output = Result<T, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResponseFutureProj::Forwarded { future } => future.poll(cx),
            ResponseFutureProj::Rejected { error } => {
                let error = error.take().expect("polled after completion");
                Poll::Ready(Err(Box::new(error)))
            }
        }
    }
}

impl<L, S, F> Clone for KeyLimitService<L, S, F>
where
    L: ?Sized,
    S: Clone,
    F: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
            key_fn: self.key_fn.clone(),
        }
    }
}

impl<L, S, F, Req> Service<Req> for KeyLimitService<L, S, F>
where
    L: Strategy + ?Sized + Send + Sync + 'static,
    S: Service<Req, Error = BoxError>,
    F: Fn(&Req) -> String,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = (self.key_fn)(&req);

        match self.limiter.allow(&key) {
            ControlFlow::Continue(()) => ResponseFuture::Forwarded {
                future: self.inner.call(req),
            },
            ControlFlow::Break(Reason::Overloaded { retry_after }) => ResponseFuture::Rejected {
                error: Some(KeyLimitError::RateLimited { retry_after }),
            },
        }
    }
}

impl<L, S, F> KeyLimitService<L, S, F>
where
    L: ?Sized,
{
    pub fn new(inner: S, limiter: Arc<L>, key_fn: F) -> Self {
        Self {
            inner,
            limiter,
            key_fn,
        }
    }
}

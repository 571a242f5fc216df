/// Errors produced by the key-limit middleware.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyLimitError {
    /// The request's key is over its quota.
    ///
    /// The duration indicates when the client should retry. Hosts mapping
    /// this to HTTP typically answer `429 Too Many Requests` with a
    /// `Retry-After` header.
    #[error("Rate limit exceeded for key; retry after {retry_after:?}")]
    RateLimited {
        /// The duration to wait before retrying.
        retry_after: std::time::Duration,
    },
}

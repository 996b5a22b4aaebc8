use thiserror::Error;

/// Why processing of a page run or a site stopped before it ran out of work.
///
/// Empty result pages and heuristics that find nothing are not failures, they end a
/// tier or a run normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limit exceeded on every configured API credential")]
    RateLimitExceeded,
}

//! Error taxonomy for the pagechat engine.
//!
//! Each layer of the pipeline owns a small error enum; [`QueryError`]
//! aggregates them at the orchestrator seam. `Display` strings are written
//! for end users: the HTTP layer surfaces them verbatim as the `error`
//! field of a query response, so they must stand alone without source-chain
//! context.

use thiserror::Error;

/// Failures raised while fetching and extracting page content.
///
/// The fetcher never retries; callers decide whether a failure is terminal.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The page answered 401/403 or redirected to a login form.
    #[error(
        "the page requires authentication and cannot be read; try a publicly accessible page"
    )]
    AuthRequired,

    /// Extraction produced no usable text.
    #[error(
        "the page has no readable content; it may rely on scripts or load its text dynamically"
    )]
    Empty,

    /// The upstream server did not answer within the configured deadline.
    #[error("timed out while downloading the page")]
    Timeout,

    /// DNS or connection-level failure before any response arrived.
    #[error("the page could not be reached: {reason}")]
    Unreachable { reason: String },

    /// Any other non-success HTTP status.
    #[error("the page responded with HTTP status {status}")]
    Status { status: u16 },
}

/// Failures raised by an embedding provider.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Transport failure, timeout, or an unusable response.
    #[error("the embedding service is unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    /// The provider rejected the call with a rate limit.
    #[error("the embedding service is rate limited; try again shortly")]
    RateLimited,
}

/// Failures raised by a generation provider.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport failure or an unusable response.
    #[error("the answer service is unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    /// The provider rejected the call with a rate limit.
    #[error("the answer service is rate limited; try again shortly")]
    RateLimited,

    /// The provider did not answer within the configured deadline.
    #[error("timed out while waiting for an answer")]
    Timeout,
}

/// Top-level failure of a single query, surfaced to the API caller.
///
/// Every pipeline error short-circuits the orchestrator and maps into one
/// of these variants; none are retried inside the engine.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request was malformed and was rejected before any external call.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl QueryError {
    /// `true` when the request itself was invalid, as opposed to a domain
    /// failure from an upstream service. The transport layer uses this to
    /// pick a 4xx status instead of a 200-with-error body.
    pub fn is_validation(&self) -> bool {
        matches!(self, QueryError::Validation(_))
    }
}

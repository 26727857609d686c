//! Error types for the pricehound-search crate.
//!
//! All errors carry stable string messages suitable for returning to the
//! HTTP caller as a plain-text body. Cookie values and proxy credentials
//! never appear in error messages.

/// Errors that can occur while searching the marketplaces.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The query was empty after normalisation.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A request to a marketplace failed at the transport level.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A marketplace kept failing until its attempt budget ran out.
    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),

    /// The marketplace response did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The per-call session (cookie snapshot, HTTP client) could not be built.
    #[error("session error: {0}")]
    Session(String),

    /// The search was cancelled or hit its deadline.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Both marketplaces answered, but neither had a matching product.
    #[error("no products found")]
    NotFound,

    /// Both marketplaces failed; the message names each cause.
    #[error("all marketplaces failed: {0}")]
    AllSourcesFailed(String),

    /// Cache connection or (de)serialisation failure. Never leaves the cache module.
    #[error("cache error: {0}")]
    Cache(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for pricehound-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

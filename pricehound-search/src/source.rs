//! Trait definition for marketplace product sources.
//!
//! Ozon and Wildberries share no response structure, so each implements
//! [`ProductSource`] independently; the orchestrator only sees this trait.

use tokio_util::sync::CancellationToken;

use crate::error::SearchError;
use crate::types::{Marketplace, Product};

/// A marketplace adapter.
///
/// Implementors translate one marketplace's protocol into [`Product`]
/// values. Each handles its own:
///
/// - session setup (cookies, proxy, warm-up)
/// - request construction and browser fingerprint
/// - attempt budget and pacing
/// - response parsing
///
/// All implementations must be `Send + Sync` so both sources can run
/// concurrently from one orchestrator.
pub trait ProductSource: Send + Sync {
    /// Search the marketplace for a normalised query.
    ///
    /// Implementations must observe `cancel` in every wait, including retry
    /// pauses and in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] when the attempt budget is exhausted, the
    /// response has an unexpected shape, the session cannot be built, or the
    /// call is cancelled.
    fn fetch(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<Vec<Product>, SearchError>> + Send;

    /// Which marketplace this source talks to.
    fn marketplace(&self) -> Marketplace;
}

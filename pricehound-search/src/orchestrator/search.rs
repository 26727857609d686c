//! Core search orchestrator: cache check, concurrent two-marketplace
//! fan-out, merge, price sort, cache write.

use std::pin::pin;

use tokio_util::sync::CancellationToken;

use crate::cache::ProductCache;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::query::normalize_query;
use crate::source::ProductSource;
use crate::sources::{OzonSource, WildberriesSource};
use crate::types::Product;

use super::ranking::sort_by_price;

/// Coordinates one cache and two marketplace sources.
///
/// `A`'s products come first in the merged list before sorting, so on equal
/// prices `A` wins.
pub struct Orchestrator<A, B> {
    primary: A,
    secondary: B,
    cache: ProductCache,
    config: SearchConfig,
    shutdown: CancellationToken,
}

impl Orchestrator<OzonSource, WildberriesSource> {
    /// Production wiring: Ozon first, Wildberries second.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid.
    pub fn marketplaces(config: SearchConfig, cache: ProductCache) -> Result<Self, SearchError> {
        let ozon = OzonSource::new(config.ozon.clone());
        let wildberries = WildberriesSource::new(config.wildberries.clone());
        Self::new(ozon, wildberries, cache, config)
    }
}

impl<A, B> Orchestrator<A, B>
where
    A: ProductSource,
    B: ProductSource,
{
    /// Build an orchestrator over two sources.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid.
    pub fn new(
        primary: A,
        secondary: B,
        cache: ProductCache,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            primary,
            secondary,
            cache,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// The primary source.
    pub fn primary(&self) -> &A {
        &self.primary
    }

    /// The secondary source.
    pub fn secondary(&self) -> &B {
        &self.secondary
    }

    /// The result cache.
    pub fn cache(&self) -> &ProductCache {
        &self.cache
    }

    /// Cancel every in-flight search. Later searches are cancelled at once.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Search both marketplaces for `raw_query`.
    ///
    /// # Pipeline
    ///
    /// 1. Normalise the query; reject it if empty
    /// 2. Return the cached list on a hit, without touching either source
    /// 3. Query both sources concurrently and wait for both, cancelling them
    ///    if the search deadline passes first
    /// 4. Concatenate primary then secondary, stable-sort by price
    /// 5. Write the sorted list to the cache (best effort)
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidQuery`] if the query normalises to nothing
    /// - [`SearchError::AllSourcesFailed`] if both sources fail; nothing is cached
    /// - [`SearchError::NotFound`] if both succeed with no products
    ///
    /// A single failing source is logged and its products are simply absent.
    pub async fn search(&self, raw_query: &str) -> Result<Vec<Product>, SearchError> {
        let query = normalize_query(raw_query);
        if query.is_empty() {
            return Err(SearchError::InvalidQuery(
                "query parameter is required".into(),
            ));
        }

        if let Some(cached) = self.cache.get(&query).await {
            tracing::info!(count = cached.len(), "serving search from cache");
            tracing::debug!(query = %query, "cache hit");
            return Ok(cached);
        }

        let (primary, secondary) = self.fan_out(&query).await;

        let mut products = match (primary, secondary) {
            (Err(a), Err(b)) => {
                tracing::warn!(primary = %a, secondary = %b, "every marketplace failed");
                return Err(SearchError::AllSourcesFailed(format!(
                    "{}: {a}; {}: {b}",
                    self.primary.marketplace(),
                    self.secondary.marketplace()
                )));
            }
            (Ok(mut a), Ok(b)) => {
                a.extend(b);
                a
            }
            (Ok(a), Err(e)) => {
                tracing::warn!(marketplace = %self.secondary.marketplace(), error = %e, "marketplace failed, returning partial results");
                a
            }
            (Err(e), Ok(b)) => {
                tracing::warn!(marketplace = %self.primary.marketplace(), error = %e, "marketplace failed, returning partial results");
                b
            }
        };

        if products.is_empty() {
            return Err(SearchError::NotFound);
        }

        sort_by_price(&mut products);
        self.cache.set(&query, &products).await;

        tracing::info!(count = products.len(), "search complete");
        Ok(products)
    }

    /// Run both sources to completion under one per-search token.
    ///
    /// If the deadline passes first the token is cancelled and both sources
    /// are still awaited; they return [`SearchError::Cancelled`] promptly.
    async fn fan_out(
        &self,
        query: &str,
    ) -> (
        Result<Vec<Product>, SearchError>,
        Result<Vec<Product>, SearchError>,
    ) {
        let cancel = self.shutdown.child_token();
        let primary = self.primary.fetch(query, &cancel);
        let secondary = self.secondary.fetch(query, &cancel);
        let mut both = pin!(futures::future::join(primary, secondary));

        let outcome = tokio::select! {
            outcome = &mut both => outcome,
            () = tokio::time::sleep(self.config.search_deadline()) => {
                tracing::warn!(
                    deadline_seconds = self.config.search_deadline_seconds,
                    "search deadline reached, cancelling marketplaces"
                );
                cancel.cancel();
                both.await
            }
        };

        for (marketplace, result) in [
            (self.primary.marketplace(), &outcome.0),
            (self.secondary.marketplace(), &outcome.1),
        ] {
            match result {
                Ok(products) => {
                    tracing::debug!(%marketplace, count = products.len(), "marketplace returned products")
                }
                Err(e) => tracing::debug!(%marketplace, error = %e, "marketplace returned error"),
            }
        }
        outcome
    }
}

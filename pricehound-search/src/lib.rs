//! # pricehound-search
//!
//! Price comparison search across two Russian marketplaces, Ozon and
//! Wildberries.
//!
//! A free-text query is normalised, looked up in a result cache, and on a
//! miss sent to both marketplaces concurrently. The two product lists are
//! merged, sorted by ascending price, cached, and returned.
//!
//! ## Design
//!
//! - Each marketplace is a [`ProductSource`] that owns its session, retry
//!   policy, and response parsing
//! - Sources run concurrently and are always both awaited; one failing
//!   marketplace degrades the result instead of failing the search
//! - Results are cached by normalised query in Redis, falling back to an
//!   uncached mode when Redis is unreachable
//! - Every outbound wait observes a per-search cancellation token, fired by
//!   the search deadline or by [`Orchestrator::shutdown`]
//!
//! ## Security
//!
//! - Queries are logged only at trace level
//! - The Ozon cookie snapshot is read per call and never logged
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> pricehound_search::Result<()> {
//! use pricehound_search::{Orchestrator, ProductCache, SearchConfig};
//!
//! let config = SearchConfig::default();
//! let cache = ProductCache::in_memory(config.cache_ttl());
//! let orchestrator = Orchestrator::marketplaces(config, cache)?;
//! for product in orchestrator.search("iPhone 12").await? {
//!     println!("{} {}: {}", product.discount_price, product.name, product.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod query;
pub mod retry;
pub mod session;
pub mod source;
pub mod sources;
pub mod text;
pub mod types;

pub use cache::{ProductCache, RedisSettings};
pub use config::{OzonConfig, SearchConfig, WildberriesConfig};
pub use error::{Result, SearchError};
pub use orchestrator::Orchestrator;
pub use query::normalize_query;
pub use source::ProductSource;
pub use sources::{OzonSource, WildberriesSource};
pub use types::{Marketplace, Product};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marketplaces_validates_config() {
        let config = SearchConfig {
            cache_ttl_seconds: 0,
            ..Default::default()
        };
        let result = Orchestrator::marketplaces(config, ProductCache::disabled());
        assert!(result.is_err());
        assert!(result.err().map(|e| e.to_string()).unwrap_or_default().contains("cache_ttl"));
    }

    #[test]
    fn marketplaces_wires_ozon_first() {
        let orchestrator =
            Orchestrator::marketplaces(SearchConfig::default(), ProductCache::disabled())
                .expect("default config is valid");
        assert_eq!(orchestrator.primary().marketplace(), Marketplace::Ozon);
        assert_eq!(orchestrator.secondary().marketplace(), Marketplace::Wildberries);
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let orchestrator =
            Orchestrator::marketplaces(SearchConfig::default(), ProductCache::disabled())
                .expect("default config is valid");
        let err = orchestrator.search("  ").await.unwrap_err();
        assert!(err.to_string().contains("query parameter is required"));
    }
}

//! Integration tests for the search orchestrator pipeline.
//!
//! These tests exercise normalise → cache → fan-out → merge → sort → cache
//! write using synthetic sources (no network calls). Live marketplace tests
//! live next to each source and are marked `#[ignore]`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pricehound_search::{
    Marketplace, Orchestrator, Product, ProductCache, ProductSource, SearchConfig, SearchError,
};
use tokio_util::sync::CancellationToken;

enum Behaviour {
    Products(Vec<(&'static str, &'static str)>),
    Fail(&'static str),
    /// Never answers until cancelled.
    Hang,
}

struct MockSource {
    marketplace: Marketplace,
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
}

impl MockSource {
    fn new(marketplace: Marketplace, behaviour: Behaviour) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            marketplace,
            behaviour,
            calls: Arc::clone(&calls),
        };
        (source, calls)
    }
}

impl ProductSource for MockSource {
    async fn fetch(
        &self,
        _query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Product>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Products(items) => Ok(items
                .iter()
                .map(|(id, price)| make_product(self.marketplace, id, price))
                .collect()),
            Behaviour::Fail(message) => Err(SearchError::RetriesExhausted((*message).into())),
            Behaviour::Hang => {
                cancel.cancelled().await;
                Err(SearchError::Cancelled(format!(
                    "{} search was cancelled",
                    self.marketplace
                )))
            }
        }
    }

    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }
}

fn make_product(marketplace: Marketplace, id: &str, price: &str) -> Product {
    Product {
        url: format!("https://{marketplace}.test/{id}"),
        image_url: format!("https://{marketplace}.test/{id}.jpg"),
        id: id.to_string(),
        name: format!("{marketplace} item {id}"),
        discount_price: price.to_string(),
        base_price: price.to_string(),
        statistic: String::new(),
        stars: String::new(),
        reviews: String::new(),
    }
}

struct Harness {
    orchestrator: Orchestrator<MockSource, MockSource>,
    ozon_calls: Arc<AtomicUsize>,
    wildberries_calls: Arc<AtomicUsize>,
}

fn harness(ozon: Behaviour, wildberries: Behaviour, config: SearchConfig) -> Harness {
    let (ozon, ozon_calls) = MockSource::new(Marketplace::Ozon, ozon);
    let (wildberries, wildberries_calls) = MockSource::new(Marketplace::Wildberries, wildberries);
    let cache = ProductCache::in_memory(config.cache_ttl());
    let orchestrator = Orchestrator::new(ozon, wildberries, cache, config)
        .unwrap_or_else(|e| panic!("Expected valid config, got: {e}"));
    Harness {
        orchestrator,
        ozon_calls,
        wildberries_calls,
    }
}

fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.id.as_str()).collect()
}

// ── Merge and Cache ───────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_search_sorts_and_caches() {
    let h = harness(
        Behaviour::Products(vec![
            ("o1", "2 999 ₽"),
            ("o2", "459 ₽"),
            ("o3", "1 299 ₽"),
        ]),
        Behaviour::Products(vec![("w1", "899"), ("w2", "459")]),
        SearchConfig::default(),
    );

    let products = h
        .orchestrator
        .search("Phone")
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(ids(&products), ["o2", "w2", "w1", "o3", "o1"]);

    let again = h
        .orchestrator
        .search("  phone ")
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(again, products);
    assert_eq!(h.ozon_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.wildberries_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cache_hit_bypasses_sources() {
    let h = harness(
        Behaviour::Products(vec![("o1", "10")]),
        Behaviour::Products(vec![("w1", "20")]),
        SearchConfig::default(),
    );
    let cached = vec![make_product(Marketplace::Wildberries, "cached", "1")];
    h.orchestrator.cache().set("iphone 12", &cached).await;

    let products = h
        .orchestrator
        .search("IPHONE   12")
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(products, cached);
    assert_eq!(h.ozon_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.wildberries_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn partial_failure_returns_and_caches_survivor() {
    let h = harness(
        Behaviour::Fail("ozon returned no data after 2 attempts"),
        Behaviour::Products(vec![("w2", "300"), ("w1", "100")]),
        SearchConfig::default(),
    );

    let products = h
        .orchestrator
        .search("charger")
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(ids(&products), ["w1", "w2"]);

    let cached = h.orchestrator.cache().get("charger").await;
    assert_eq!(cached, Some(products));
}

#[tokio::test]
async fn degraded_cache_still_searches() {
    let (ozon, ozon_calls) =
        MockSource::new(Marketplace::Ozon, Behaviour::Products(vec![("o1", "5")]));
    let (wildberries, _) = MockSource::new(Marketplace::Wildberries, Behaviour::Products(vec![]));
    let orchestrator = Orchestrator::new(
        ozon,
        wildberries,
        ProductCache::disabled(),
        SearchConfig::default(),
    )
    .unwrap_or_else(|e| panic!("Expected valid config, got: {e}"));

    for _ in 0..2 {
        let products = orchestrator
            .search("phone")
            .await
            .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
        assert_eq!(ids(&products), ["o1"]);
    }
    assert_eq!(ozon_calls.load(Ordering::SeqCst), 2);
}

// ── Failures ──────────────────────────────────────────────────────

#[tokio::test]
async fn both_failing_reports_each_cause() {
    let h = harness(
        Behaviour::Fail("captcha wall"),
        Behaviour::Fail("429 storm"),
        SearchConfig::default(),
    );

    let err = h.orchestrator.search("phone").await.unwrap_err();
    assert!(matches!(err, SearchError::AllSourcesFailed(_)), "got: {err}");
    let message = err.to_string();
    assert!(message.contains("ozon"), "{message}");
    assert!(message.contains("captcha wall"), "{message}");
    assert!(message.contains("wildberries"), "{message}");
    assert!(message.contains("429 storm"), "{message}");

    assert!(h.orchestrator.cache().get("phone").await.is_none());
}

#[tokio::test]
async fn no_products_anywhere_is_not_found() {
    let h = harness(
        Behaviour::Products(vec![]),
        Behaviour::Products(vec![]),
        SearchConfig::default(),
    );
    let err = h.orchestrator.search("zzzz").await.unwrap_err();
    assert!(matches!(err, SearchError::NotFound), "got: {err}");
    assert!(h.orchestrator.cache().get("zzzz").await.is_none());
}

#[tokio::test]
async fn empty_query_is_invalid() {
    let h = harness(
        Behaviour::Products(vec![("o1", "1")]),
        Behaviour::Products(vec![("w1", "1")]),
        SearchConfig::default(),
    );
    let err = h.orchestrator.search(" \n\t ").await.unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery(_)), "got: {err}");
    assert_eq!(h.ozon_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.wildberries_calls.load(Ordering::SeqCst), 0);
}

// ── Cancellation ──────────────────────────────────────────────────

#[tokio::test]
async fn deadline_cancels_hanging_source() {
    let config = SearchConfig {
        search_deadline_seconds: 1,
        ..Default::default()
    };
    let h = harness(
        Behaviour::Hang,
        Behaviour::Products(vec![("w1", "250")]),
        config,
    );

    let started = tokio::time::Instant::now();
    let products = h
        .orchestrator
        .search("phone")
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(ids(&products), ["w1"]);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn shutdown_cancels_in_flight_search() {
    let h = Arc::new(harness(
        Behaviour::Hang,
        Behaviour::Hang,
        SearchConfig::default(),
    ));

    let searcher = Arc::clone(&h);
    let search = tokio::spawn(async move { searcher.orchestrator.search("phone").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.orchestrator.shutdown();

    let result = tokio::time::timeout(Duration::from_secs(2), search)
        .await
        .unwrap_or_else(|_| panic!("search did not stop after shutdown"))
        .unwrap_or_else(|e| panic!("search task panicked: {e}"));
    let err = result.unwrap_err();
    assert!(matches!(err, SearchError::AllSourcesFailed(_)), "got: {err}");
    assert!(err.to_string().contains("cancelled"));
}

//! Router tests driven through `tower::ServiceExt::oneshot`, with synthetic
//! marketplace sources and no listening socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use pricehound::router;
use pricehound_search::{
    Marketplace, Orchestrator, Product, ProductCache, ProductSource, SearchConfig, SearchError,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct FixedSource {
    marketplace: Marketplace,
    prices: Vec<&'static str>,
    fail: bool,
    calls: AtomicUsize,
}

impl FixedSource {
    fn with_prices(marketplace: Marketplace, prices: Vec<&'static str>) -> Self {
        Self {
            marketplace,
            prices,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(marketplace: Marketplace) -> Self {
        Self {
            marketplace,
            prices: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ProductSource for FixedSource {
    async fn fetch(
        &self,
        _query: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Product>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SearchError::RetriesExhausted(format!(
                "{} returned no data after 2 attempts",
                self.marketplace
            )));
        }
        Ok(self
            .prices
            .iter()
            .enumerate()
            .map(|(i, price)| Product {
                url: format!("https://{}.test/{i}", self.marketplace),
                image_url: String::new(),
                id: format!("{}-{i}", self.marketplace),
                name: format!("item {i}"),
                discount_price: (*price).to_string(),
                base_price: (*price).to_string(),
                statistic: String::new(),
                stars: String::new(),
                reviews: String::new(),
            })
            .collect())
    }

    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }
}

fn static_dir() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("index.html"), "<h1>pricehound</h1>").expect("write index");
    std::fs::write(dir.path().join("app.js"), "console.log(1)").expect("write asset");
    dir
}

fn app(
    ozon: FixedSource,
    wildberries: FixedSource,
    dir: &TempDir,
) -> (axum::Router, Arc<Orchestrator<FixedSource, FixedSource>>) {
    let orchestrator = Arc::new(
        Orchestrator::new(
            ozon,
            wildberries,
            ProductCache::in_memory(Duration::from_secs(60)),
            SearchConfig::default(),
        )
        .expect("valid config"),
    );
    (router(Arc::clone(&orchestrator), dir.path()), orchestrator)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
        .await
        .expect("infallible");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, content_type, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn search_returns_sorted_json() {
    let dir = static_dir();
    let (app, _) = app(
        FixedSource::with_prices(Marketplace::Ozon, vec!["1 299 ₽", "300 ₽"]),
        FixedSource::with_prices(Marketplace::Wildberries, vec!["500"]),
        &dir,
    );

    let (status, content_type, body) = get(app, "/search?query=Phone%20Case").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));

    let products: Vec<serde_json::Value> = serde_json::from_str(&body).expect("json array");
    let prices: Vec<&str> = products
        .iter()
        .filter_map(|p| p["product_discount_price"].as_str())
        .collect();
    assert_eq!(prices, ["300 ₽", "500", "1 299 ₽"]);
    assert_eq!(products[0]["product_id"], "ozon-1");
}

#[tokio::test]
async fn blank_query_is_bad_request() {
    let dir = static_dir();
    let (app, orchestrator) = app(
        FixedSource::with_prices(Marketplace::Ozon, vec!["1"]),
        FixedSource::with_prices(Marketplace::Wildberries, vec!["2"]),
        &dir,
    );

    let (status, _, body) = get(app.clone(), "/search?query=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("query parameter is required"), "{body}");

    let (status, _, _) = get(app, "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(orchestrator.primary().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dual_failure_is_internal_error_with_message() {
    let dir = static_dir();
    let (app, _) = app(
        FixedSource::failing(Marketplace::Ozon),
        FixedSource::failing(Marketplace::Wildberries),
        &dir,
    );

    let (status, _, body) = get(app, "/search?query=phone").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("ozon returned no data"), "{body}");
    assert!(body.contains("wildberries returned no data"), "{body}");
}

#[tokio::test]
async fn no_products_is_internal_error() {
    let dir = static_dir();
    let (app, _) = app(
        FixedSource::with_prices(Marketplace::Ozon, vec![]),
        FixedSource::with_prices(Marketplace::Wildberries, vec![]),
        &dir,
    );

    let (status, _, body) = get(app, "/search?query=nothing").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "no products found");
}

#[tokio::test]
async fn repeat_search_is_served_from_cache() {
    let dir = static_dir();
    let (app, orchestrator) = app(
        FixedSource::with_prices(Marketplace::Ozon, vec!["10"]),
        FixedSource::with_prices(Marketplace::Wildberries, vec!["20"]),
        &dir,
    );

    let (first_status, _, first) = get(app.clone(), "/search?query=phone").await;
    let (second_status, _, second) = get(app, "/search?query=PHONE").await;
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(orchestrator.primary().calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.secondary().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn other_paths_serve_static_assets() {
    let dir = static_dir();
    let (app, _) = app(
        FixedSource::with_prices(Marketplace::Ozon, vec![]),
        FixedSource::with_prices(Marketplace::Wildberries, vec![]),
        &dir,
    );

    let (status, _, body) = get(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>pricehound</h1>");

    let (status, _, body) = get(app.clone(), "/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "console.log(1)");

    let (status, _, _) = get(app, "/missing.css").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//! Wildberries source: the public catalog search API.
//!
//! No cookie snapshot is needed, only a warm-up hit on the storefront. The
//! API is flaky under load (429/5xx bursts), so the attempt budget is large
//! with a fixed pause. Prices come as integer kopecks, and image URLs are not
//! returned at all: they are derived from the product id and the CDN's
//! basket sharding scheme.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::WildberriesConfig;
use crate::error::SearchError;
use crate::http;
use crate::retry::{self, Backoff};
use crate::session::{SessionOptions, SourceSession};
use crate::source::ProductSource;
use crate::types::{combine_statistic, Marketplace, Product};

use super::json_text;

const MARKETPLACE: Marketplace = Marketplace::Wildberries;

/// Product ids per `vol` bucket.
const VOL_DIVISOR: u64 = 100_000;

/// Product ids per `part` bucket.
const PART_DIVISOR: u64 = 1_000;

/// Kopecks per rouble.
const MINOR_UNITS: i64 = 100;

/// Inclusive upper `vol` bound for each basket shard, in ascending order.
const BASKET_SHARDS: &[(u64, &str)] = &[
    (143, "01"),
    (287, "02"),
    (431, "03"),
    (719, "04"),
    (1007, "05"),
    (1061, "06"),
    (1115, "07"),
    (1169, "08"),
    (1313, "09"),
    (1601, "10"),
    (1655, "11"),
    (1919, "12"),
    (2045, "13"),
    (2189, "14"),
    (2405, "15"),
    (2621, "16"),
    (2837, "17"),
    (3053, "18"),
    (3269, "19"),
    (3485, "20"),
    (3701, "21"),
    (3917, "22"),
    (4133, "23"),
    (4349, "24"),
    (4565, "25"),
    (4877, "26"),
    (5189, "27"),
    (5501, "28"),
    (5813, "29"),
    (6125, "30"),
    (6437, "31"),
    (6749, "32"),
    (7061, "33"),
    (7373, "34"),
    (7685, "35"),
    (7997, "36"),
    (8309, "37"),
];

/// Shard for every `vol` above the last bound.
const LAST_BASKET_SHARD: &str = "38";

/// Wildberries catalog search client.
pub struct WildberriesSource {
    config: WildberriesConfig,
}

impl WildberriesSource {
    /// Create a source.
    pub fn new(config: WildberriesConfig) -> Self {
        Self { config }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/exactmatch/ru/common/v18/search?appType=1&curr=rub&dest=-1257786&lang=ru&page=1&query={}&resultset=catalog&sort=priceup&spp=30",
            self.config.search_origin,
            http::escape_query(query)
        )
    }

    fn referer(&self, query: &str) -> String {
        format!(
            "{}/catalog/0/search.aspx?search={}",
            self.config.www_origin,
            http::escape_query(query)
        )
    }

    fn headers(&self, referer: Option<&str>) -> HeaderMap {
        let mut pairs = vec![
            ("accept", "application/json, text/plain, */*"),
            ("accept-language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
            ("sec-fetch-site", "same-site"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-dest", "empty"),
            ("origin", self.config.www_origin.as_str()),
            ("x-requested-with", "XMLHttpRequest"),
        ];
        if let Some(referer) = referer {
            pairs.push(("referer", referer));
        }
        http::header_map(&pairs)
    }

    async fn open_session(&self) -> Result<SourceSession, SearchError> {
        SourceSession::open(SessionOptions {
            marketplace: MARKETPLACE,
            user_agent: self.config.user_agent.clone(),
            timeout: Duration::from_secs(self.config.timeout_seconds),
            proxy_path: self.config.proxy_path.clone(),
            cookies: Vec::new(),
            cookie_origins: Vec::new(),
        })
        .await
    }

    /// Query the search API until it answers 200 or the budget runs out.
    async fn fetch_catalog(
        &self,
        session: &SourceSession,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SearchError> {
        let url = self.search_url(query);
        let referer = self.referer(query);
        let backoff = Backoff::fixed_ms(self.config.backoff_ms);

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                retry::pause(cancel, MARKETPLACE, backoff.delay()).await?;
            }
            tracing::debug!(attempt, "wildberries search request");

            let request = session
                .client()
                .get(&url)
                .headers(self.headers(Some(&referer)))
                .send();
            let response = match retry::until_cancelled(cancel, MARKETPLACE, request).await? {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "wildberries request failed");
                    continue;
                }
            };

            let status = response.status();
            let body = match retry::until_cancelled(cancel, MARKETPLACE, response.text()).await? {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "wildberries response read failed");
                    continue;
                }
            };

            if status == StatusCode::OK {
                tracing::trace!(bytes = body.len(), "wildberries response received");
                return Ok(body);
            }
            tracing::warn!(
                attempt,
                status = status.as_u16(),
                body = http::snippet(&body),
                "wildberries unexpected status"
            );
        }

        Err(SearchError::RetriesExhausted(format!(
            "wildberries returned no data after {} attempts",
            self.config.max_attempts
        )))
    }
}

impl ProductSource for WildberriesSource {
    async fn fetch(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Product>, SearchError> {
        tracing::trace!(query, "wildberries search");
        retry::check(cancel, MARKETPLACE)?;

        let session = self.open_session().await?;
        let home = format!("{}/", self.config.www_origin);
        session.warm_up(&home, self.headers(None), cancel).await?;

        let body = self.fetch_catalog(&session, query, cancel).await?;
        let products = parse_wildberries_json(&body, &self.config.www_origin)?;

        if self.config.probe_images {
            probe_images(&session, &products, cancel).await;
        }
        Ok(products)
    }

    fn marketplace(&self) -> Marketplace {
        MARKETPLACE
    }
}

/// Parse a search API response into products.
///
/// Extracted as a separate function for testability with fixture JSON.
pub(crate) fn parse_wildberries_json(
    body: &str,
    www_origin: &str,
) -> Result<Vec<Product>, SearchError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("wildberries response is not JSON: {e}")))?;

    let items = root
        .get("products")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SearchError::Parse("wildberries products not found or not an array".into())
        })?;

    let products: Vec<Product> = items
        .iter()
        .filter_map(|item| parse_item(item, www_origin))
        .collect();

    tracing::debug!(items = items.len(), count = products.len(), "wildberries results parsed");
    Ok(products)
}

fn parse_item(item: &Value, www_origin: &str) -> Option<Product> {
    let Some(id) = item.get("id").and_then(Value::as_u64).filter(|id| *id > 0) else {
        tracing::debug!("skipping wildberries item without id");
        return None;
    };

    let price = item.pointer("/sizes/0/price");
    let minor = |field: &str| {
        price
            .and_then(|p| p.get(field))
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(0)
            / MINOR_UNITS
    };

    let stars = json_text(item.get("rating"));
    let reviews = json_text(item.get("feedbacks"));

    Some(Product {
        url: format!("{www_origin}/catalog/{id}/detail.aspx"),
        image_url: image_url(id),
        id: id.to_string(),
        name: json_text(item.get("name")),
        discount_price: minor("product").to_string(),
        base_price: minor("basic").to_string(),
        statistic: combine_statistic(&stars, &reviews),
        stars,
        reviews,
    })
}

/// Basket shard for a `vol` bucket.
pub fn basket_shard(vol: u64) -> &'static str {
    BASKET_SHARDS
        .iter()
        .find(|(upper, _)| vol <= *upper)
        .map_or(LAST_BASKET_SHARD, |&(_, shard)| shard)
}

/// Primary product image on the basket CDN.
pub fn image_url(id: u64) -> String {
    let vol = id / VOL_DIVISOR;
    let part = id / PART_DIVISOR;
    let shard = basket_shard(vol);
    format!("https://basket-{shard}.wbbasket.ru/vol{vol}/part{part}/{id}/images/big/1.webp")
}

/// Best-effort GET of every derived image URL.
///
/// A failing probe is logged and otherwise ignored; the URL stays on the
/// product either way.
async fn probe_images(session: &SourceSession, products: &[Product], cancel: &CancellationToken) {
    let probes = products.iter().map(|product| async move {
        let request = session.client().get(&product.image_url).send();
        match retry::until_cancelled(cancel, MARKETPLACE, request).await {
            Ok(Ok(response)) if response.status() == StatusCode::OK => {}
            Ok(Ok(response)) => tracing::debug!(
                id = %product.id,
                status = response.status().as_u16(),
                "wildberries image probe non-200"
            ),
            Ok(Err(e)) => {
                tracing::debug!(id = %product.id, error = %e, "wildberries image probe failed")
            }
            Err(_) => {}
        }
    });
    futures::future::join_all(probes).await;
}

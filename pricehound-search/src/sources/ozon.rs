//! Ozon source: the storefront's page-composition API.
//!
//! Ozon sits behind an anti-bot layer, so every call:
//!
//! 1. seeds a fresh cookie jar from a browser-exported snapshot,
//! 2. loads the storefront home page to pick up fresh anti-bot cookies,
//! 3. requests `composer-api.bx/page/json/v2` for the search page, following
//!    redirects by hand (the API answers with relative `Location`s),
//! 4. digs the product grid out of the `widgetStates` map, where it is
//!    stored as a JSON string under a key like `tileGridDesktop-1234-default-1`.

use std::time::Duration;

use reqwest::header::{HeaderMap, LOCATION};
use reqwest::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::OzonConfig;
use crate::error::SearchError;
use crate::http;
use crate::retry::{self, Backoff};
use crate::session::{self, SessionOptions, SourceSession};
use crate::source::ProductSource;
use crate::text::normalize_text;
use crate::types::{combine_statistic, Marketplace, Product};

use super::json_text;

const MARKETPLACE: Marketplace = Marketplace::Ozon;

/// Prefix of the widget-state key holding the search result grid.
const TILE_GRID_PREFIX: &str = "tileGridDesktop-";

/// Substring of the second label that marks a review count ("12 отзывов").
const REVIEW_MARKER: &str = "отзыв";

/// Ozon page-composition API client.
pub struct OzonSource {
    config: OzonConfig,
}

impl OzonSource {
    /// Create a source; nothing is read or requested until [`fetch`](ProductSource::fetch).
    pub fn new(config: OzonConfig) -> Self {
        Self { config }
    }

    /// Check that the cookie snapshot is readable, returning the cookie count.
    ///
    /// Used at startup to report a broken snapshot early; every fetch reads
    /// the snapshot again.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Session`] if the snapshot is missing or invalid.
    pub async fn check_cookie_snapshot(&self) -> Result<usize, SearchError> {
        session::load_cookie_snapshot(&self.config.cookies_path)
            .await
            .map(|cookies| cookies.len())
    }

    /// Composer API URL for the first price-sorted search page.
    fn search_url(&self, query: &str) -> String {
        let page_path = format!(
            "/search?text={}&sorting=price&page=1",
            http::escape_query(query)
        );
        format!(
            "{}/composer-api.bx/page/json/v2?url={}",
            self.config.api_origin,
            http::escape_query(&page_path)
        )
    }

    fn referer(&self, query: &str) -> String {
        format!(
            "{}/search/?text={}",
            self.config.www_origin,
            http::escape_query(query)
        )
    }

    /// Desktop Chrome request fingerprint.
    fn headers(&self, referer: Option<&str>) -> HeaderMap {
        let mut pairs = vec![
            ("accept", "application/json, text/plain, */*"),
            ("accept-language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
            ("sec-fetch-site", "same-site"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-dest", "empty"),
            ("origin", self.config.www_origin.as_str()),
            (
                "sec-ch-ua",
                r#""Not_A Brand";v="99", "Google Chrome";v="119", "Chromium";v="119""#,
            ),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", r#""Windows""#),
            ("upgrade-insecure-requests", "1"),
            ("dnt", "1"),
        ];
        if let Some(referer) = referer {
            pairs.push(("referer", referer));
        }
        http::header_map(&pairs)
    }

    /// Turn a redirect target into an absolute API URL.
    fn resolve_location(&self, location: &str) -> String {
        if location.starts_with('/') {
            format!("{}{location}", self.config.api_origin)
        } else if location.starts_with("composer-api") {
            format!("{}/{location}", self.config.api_origin)
        } else {
            location.to_string()
        }
    }

    async fn open_session(&self) -> Result<SourceSession, SearchError> {
        let cookies = session::load_cookie_snapshot(&self.config.cookies_path).await?;
        let mut cookie_origins = Vec::with_capacity(2);
        for origin in [&self.config.api_origin, &self.config.www_origin] {
            let url = Url::parse(origin)
                .map_err(|e| SearchError::Config(format!("invalid ozon origin {origin}: {e}")))?;
            cookie_origins.push(url);
        }

        SourceSession::open(SessionOptions {
            marketplace: MARKETPLACE,
            user_agent: self.config.user_agent.clone(),
            timeout: Duration::from_secs(self.config.timeout_seconds),
            proxy_path: self.config.proxy_path.clone(),
            cookies,
            cookie_origins,
        })
        .await
    }

    /// Request the search page within the attempt budget.
    ///
    /// Redirect hops count as attempts. Transport failures and unexpected
    /// statuses are retried; a redirect without `Location` is not.
    async fn fetch_page(
        &self,
        session: &SourceSession,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SearchError> {
        let referer = self.referer(query);
        let jitter = Backoff::random_ms(self.config.attempt_delay_ms);
        let redirect_pause = Duration::from_millis(self.config.redirect_pause_ms);
        let mut current = self.search_url(query);

        for attempt in 1..=self.config.max_attempts {
            retry::pause(cancel, MARKETPLACE, jitter.delay()).await?;
            tracing::debug!(attempt, url = %current, "ozon page request");

            let request = session
                .client()
                .get(&current)
                .headers(self.headers(Some(&referer)))
                .send();
            let response = match retry::until_cancelled(cancel, MARKETPLACE, request).await? {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "ozon request failed");
                    continue;
                }
            };

            let status = response.status();
            if is_followed_redirect(status) {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                if location.is_empty() {
                    return Err(SearchError::Parse(
                        "ozon redirect without Location".into(),
                    ));
                }
                current = self.resolve_location(location);
                tracing::debug!(attempt, status = status.as_u16(), "ozon redirect");
                retry::pause(cancel, MARKETPLACE, redirect_pause).await?;
                continue;
            }

            let body = match retry::until_cancelled(cancel, MARKETPLACE, response.text()).await? {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "ozon response read failed");
                    continue;
                }
            };

            if status == StatusCode::OK {
                tracing::trace!(bytes = body.len(), "ozon response received");
                return Ok(body);
            }
            tracing::warn!(
                attempt,
                status = status.as_u16(),
                body = http::snippet(&body),
                "ozon unexpected status"
            );
        }

        Err(SearchError::RetriesExhausted(format!(
            "ozon returned no data after {} attempts",
            self.config.max_attempts
        )))
    }
}

impl ProductSource for OzonSource {
    async fn fetch(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Product>, SearchError> {
        tracing::trace!(query, "ozon search");
        retry::check(cancel, MARKETPLACE)?;

        let session = self.open_session().await?;
        let home = format!("{}/", self.config.www_origin);
        session.warm_up(&home, self.headers(None), cancel).await?;

        let body = self.fetch_page(&session, query, cancel).await?;
        parse_ozon_json(&body, &self.config.www_origin)
    }

    fn marketplace(&self) -> Marketplace {
        MARKETPLACE
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Parse a composer API response into products.
///
/// Extracted as a separate function for testability with fixture JSON.
pub(crate) fn parse_ozon_json(body: &str, www_origin: &str) -> Result<Vec<Product>, SearchError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("ozon response is not JSON: {e}")))?;

    let states = root
        .get("widgetStates")
        .and_then(Value::as_object)
        .ok_or_else(|| SearchError::Parse("ozon widgetStates missing".into()))?;

    let (key, state) = states
        .iter()
        .find(|(key, _)| key.starts_with(TILE_GRID_PREFIX))
        .ok_or_else(|| SearchError::Parse(format!("ozon {TILE_GRID_PREFIX}* not found")))?;

    let grid_raw = state
        .as_str()
        .ok_or_else(|| SearchError::Parse(format!("ozon {key} is not a string")))?;
    let grid: Value = serde_json::from_str(grid_raw)
        .map_err(|e| SearchError::Parse(format!("ozon {key} is not JSON: {e}")))?;

    let items = grid
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Parse("ozon items not found or not an array".into()))?;

    let products: Vec<Product> = items
        .iter()
        .filter_map(|item| parse_item(item, www_origin))
        .collect();

    tracing::debug!(items = items.len(), count = products.len(), "ozon results parsed");
    Ok(products)
}

fn parse_item(item: &Value, www_origin: &str) -> Option<Product> {
    let id = json_text(item.get("sku"));
    let mut url = json_text(item.pointer("/action/link"));
    if id.is_empty() || url.is_empty() {
        tracing::debug!("skipping ozon item without sku or link");
        return None;
    }
    if url.starts_with('/') {
        url = format!("{www_origin}{url}");
    }

    let name = main_state(item, "textAtom")
        .map(|state| json_text(state.pointer("/textAtom/text")))
        .unwrap_or_default();

    let mut discount_price = String::new();
    let mut base_price = String::new();
    if let Some(prices) = main_state(item, "priceV2")
        .and_then(|state| state.pointer("/priceV2/price"))
        .and_then(Value::as_array)
    {
        for price in prices {
            let text = json_text(price.get("text"));
            match price.get("textStyle").and_then(Value::as_str) {
                Some("PRICE") => discount_price = text,
                Some("ORIGINAL_PRICE") => base_price = text,
                _ => {}
            }
        }
    }

    let (stars, reviews) = rating_labels(item).unwrap_or_default();
    let stars = normalize_text(&stars);
    let reviews = normalize_text(&reviews);

    Some(Product {
        url,
        image_url: json_text(item.pointer("/tileImage/items/0/image/link")),
        id,
        name: normalize_text(&name),
        discount_price: normalize_text(&discount_price),
        base_price: normalize_text(&base_price),
        statistic: combine_statistic(&stars, &reviews),
        stars,
        reviews,
    })
}

/// First `mainState` block tagged with `type == kind`.
fn main_state<'a>(item: &'a Value, kind: &str) -> Option<&'a Value> {
    item.get("mainState")?
        .as_array()?
        .iter()
        .find(|state| state.get("type").and_then(Value::as_str) == Some(kind))
}

/// Rating and review labels from the first `labelList` block that has both,
/// with the second one naming reviews.
fn rating_labels(item: &Value) -> Option<(String, String)> {
    item.get("mainState")?
        .as_array()?
        .iter()
        .filter(|state| state.get("type").and_then(Value::as_str) == Some("labelList"))
        .find_map(|state| {
            let stars = json_text(state.pointer("/labelList/items/0/title"));
            let reviews = json_text(state.pointer("/labelList/items/1/title"));
            (!stars.is_empty() && !reviews.is_empty() && reviews.contains(REVIEW_MARKER))
                .then_some((stars, reviews))
        })
}

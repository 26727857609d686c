//! Core types: the normalised product record and marketplace identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the rating and the review count in [`Product::statistic`].
pub const STATISTIC_SEPARATOR: &str = " • ";

/// A single product listing, normalised from one marketplace's response.
///
/// Built once by a source, never mutated afterwards. The serde field names
/// are the wire shape used by both the HTTP API and the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Canonical detail-page URL.
    #[serde(rename = "product_url")]
    pub url: String,
    /// Image URL (may be empty when the marketplace omits it).
    #[serde(rename = "image_url")]
    pub image_url: String,
    /// Marketplace item identifier.
    #[serde(rename = "product_id")]
    pub id: String,
    /// Display name.
    #[serde(rename = "product_name")]
    pub name: String,
    /// Current (discounted) price as displayed, e.g. `"1 299 ₽"` or `"1299"`.
    #[serde(rename = "product_discount_price")]
    pub discount_price: String,
    /// Original price as displayed.
    #[serde(rename = "product_base_price")]
    pub base_price: String,
    /// `"{stars} • {reviews}"`, or empty when either part is missing.
    #[serde(rename = "product_statistic")]
    pub statistic: String,
    /// Average rating as displayed.
    #[serde(rename = "product_stars")]
    pub stars: String,
    /// Review count as displayed.
    #[serde(rename = "product_reviews")]
    pub reviews: String,
}

/// Join a rating and a review count into the combined statistic string.
///
/// Returns an empty string unless both parts are present.
pub fn combine_statistic(stars: &str, reviews: &str) -> String {
    if stars.is_empty() || reviews.is_empty() {
        String::new()
    } else {
        format!("{stars}{STATISTIC_SEPARATOR}{reviews}")
    }
}

/// Marketplaces pricehound can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marketplace {
    /// Ozon: session-bound page-composition API, needs a cookie snapshot.
    Ozon,
    /// Wildberries: stateless search API.
    Wildberries,
}

impl Marketplace {
    /// Returns the lowercase name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ozon => "ozon",
            Self::Wildberries => "wildberries",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

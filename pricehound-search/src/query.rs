//! Query canonicalisation.
//!
//! The normalised form is both the cache key and the text sent to the
//! marketplaces, so `" IPHONE  12 "` and `"iphone 12"` share one entry.

/// Trim, lowercase, and collapse internal whitespace runs to a single space.
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

//! Price ordering for merged results.
//!
//! Ozon prices are display strings like `"1 299 ₽"`; Wildberries prices are
//! already bare roubles. Both reduce to an integer key once whitespace and
//! the rouble sign are removed.

use crate::types::Product;

/// Currency glyph stripped before parsing a price.
const ROUBLE_SIGN: char = '₽';

/// Integer price in roubles, or `None` when the display string does not
/// reduce to one (empty, "Нет в наличии", decimals).
pub fn price_key(display: &str) -> Option<u64> {
    let digits: String = display
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ROUBLE_SIGN)
        .collect();
    digits.parse().ok()
}

/// Stable sort by discount price, cheapest first.
///
/// Products whose price does not parse go after every priced product, in
/// their original relative order.
pub fn sort_by_price(products: &mut [Product]) {
    products.sort_by_cached_key(|p| {
        let key = price_key(&p.discount_price);
        (key.is_none(), key)
    });
}

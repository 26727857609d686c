//! Display-text cleanup for marketplace fields.
//!
//! Marketplace JSON carries HTML entities and typographic spaces
//! (`&nbsp;`, U+202F between thousands, thin spaces before `₽`).

/// Space variants folded to a plain ASCII space.
const SPACE_VARIANTS: &[char] = &['\u{00A0}', '\u{202F}', '\u{2009}'];

/// Unescape HTML entities, fold non-breaking/narrow/thin spaces, and
/// collapse whitespace runs.
pub fn normalize_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    html_escape::decode_html_entities(trimmed)
        .replace(SPACE_VARIANTS, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

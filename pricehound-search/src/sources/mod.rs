//! Marketplace source implementations.
//!
//! Each module provides a struct implementing [`crate::source::ProductSource`]
//! for one marketplace's private web API.

pub mod ozon;
pub mod wildberries;

pub use ozon::OzonSource;
pub use wildberries::WildberriesSource;

use serde_json::Value;

/// Render a JSON scalar as display text: strings as-is, numbers and bools
/// in their JSON form, everything else (absent, null, containers) empty.
pub(crate) fn json_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

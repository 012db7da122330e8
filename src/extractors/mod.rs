//! HTML extraction modules
//!
//! Each module reads one part of a marketplace page snapshot.

mod enumerator;
mod jsonld_extractor;
mod listing_extractor;
mod numeric;
mod overlay_extractor;

pub use enumerator::*;
pub use jsonld_extractor::*;
pub use listing_extractor::*;
pub use numeric::parse_count;
pub use overlay_extractor::*;

pub(crate) use numeric::first_integer;

use scraper::{ElementRef, Html, Selector};

/// First element matching `selector` whose `attr` equals `key` exactly.
///
/// Used instead of interpolating ids into selector strings.
pub(crate) fn find_keyed<'a>(
    document: &'a Html,
    selector: &Selector,
    attr: &str,
    key: &str,
) -> Option<ElementRef<'a>> {
    document
        .select(selector)
        .find(|el| el.value().attr(attr) == Some(key))
}

/// String or number JSON scalar as text. Empty strings count as missing.
pub(crate) fn json_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

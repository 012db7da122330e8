//! JSON-LD product location
//!
//! Scans the text of <script type="application/ld+json"> tags and returns the
//! first object typed `Product`. Blocks may hold a single object, an array, or
//! an @graph container. Malformed blocks are logged and skipped.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::ParseWarning;

const PRODUCT_TYPE: &str = "Product";

static JSONLD_SCRIPT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

/// Raw JSON-LD payloads in document order, trimmed.
pub fn structured_data_blobs(document: &Html) -> Vec<String> {
    document
        .select(&JSONLD_SCRIPT)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

/// First `Product` object across `blobs`, or `None`.
pub fn find_product<I, S>(blobs: I) -> Option<Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for (index, blob) in blobs.into_iter().enumerate() {
        // A bad block is skipped, later ones may still hold the product
        let json = match serde_json::from_str::<Value>(blob.as_ref()) {
            Ok(json) => json,
            Err(source) => {
                tracing::warn!("{}", ParseWarning::InvalidJson { index, source });
                continue;
            }
        };

        if let Some(product) = take_product(json) {
            tracing::debug!("found JSON-LD Product in block {}", index);
            return Some(product);
        }
    }

    tracing::debug!("no JSON-LD Product data found");
    None
}

/// Locate the product record directly on a parsed document.
pub fn locate_product(document: &Html) -> Option<Value> {
    find_product(structured_data_blobs(document))
}

fn take_product(value: Value) -> Option<Value> {
    if is_product(&value) {
        return Some(value);
    }
    match value {
        Value::Array(items) => items.into_iter().find_map(take_product),
        // Check for @graph
        Value::Object(mut obj) => match obj.remove("@graph") {
            Some(Value::Array(graph)) => graph.into_iter().find(is_product),
            _ => None,
        },
        _ => None,
    }
}

fn is_product(value: &Value) -> bool {
    value.get("@type").and_then(Value::as_str) == Some(PRODUCT_TYPE)
}

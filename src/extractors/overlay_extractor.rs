//! Seller-analytics overlay extraction
//!
//! A third-party analytics tool injects a card per listing holding sold/view
//! counts, an estimated conversion rate and a tag copy button. Cards are found
//! with a two-stage search and read field by field; a missing field becomes
//! the "N/A" sentinel without affecting the others.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::find_keyed;
use crate::model::{OverlayAnalyticsRecord, NOT_AVAILABLE};
use crate::page::{text_of, Page};

pub const SOLD_TOOLTIP: &str = "Sold in the Last 24 Hours";
pub const VIEWS_TOOLTIP: &str = "Views in the Last 24 Hours";
pub const CONVERSION_TOOLTIP: &str = "Estimated conversion rate";
pub const MARKET_LINK_TEXT: &str = "👉 View market products";

const LISTING_ID_ATTR: &str = "data-heyetsy-listing-id";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static KEYED_OVERLAY: LazyLock<Selector> =
    LazyLock::new(|| selector("div[data-heyetsy-listing-id]"));
static OVERLAY_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| selector("div#heyetsy-card-container"));
static TOOLTIP: LazyLock<Selector> = LazyLock::new(|| selector(".heyetsy-tooltip"));
static VALUE: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static COPY_BUTTON: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"button[onclick*="navigator.clipboard.writeText"]"#));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));

static WRITE_TEXT_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"writeText\('([^']+)'\)").expect("valid regex"));
static SIMILAR_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/listing/(\d+)/similar").expect("valid regex"));

/// How an overlay card was found for a listing id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLookup {
    /// Card carries the listing id attribute.
    ListingAttribute,
    /// Card holds a "View market products" link to `/listing/{id}/similar`.
    MarketProductsLink,
}

impl OverlayLookup {
    /// Stages in the order they are tried.
    pub const STAGES: [OverlayLookup; 2] = [
        OverlayLookup::ListingAttribute,
        OverlayLookup::MarketProductsLink,
    ];

    pub fn find<'a>(self, document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
        match self {
            OverlayLookup::ListingAttribute => {
                find_keyed(document, &KEYED_OVERLAY, LISTING_ID_ATTR, id)
            }
            // Cards without the id attribute still link to their market products
            OverlayLookup::MarketProductsLink => document
                .select(&OVERLAY_CONTAINER)
                .find(|container| links_to_market_products(*container, id)),
        }
    }
}

/// Find the overlay card for `id`, trying each lookup stage in turn.
pub fn locate_overlay<'a>(document: &'a Html, id: &str) -> Option<(ElementRef<'a>, OverlayLookup)> {
    OverlayLookup::STAGES
        .iter()
        .find_map(|stage| stage.find(document, id).map(|el| (el, *stage)))
}

fn links_to_market_products(container: ElementRef, id: &str) -> bool {
    container.select(&ANCHOR).any(|a| {
        let Some(href) = a.value().attr("href") else {
            return false;
        };
        let id_matches = SIMILAR_LINK
            .captures(href)
            .is_some_and(|caps| &caps[1] == id);
        id_matches && text_of(&a) == MARKET_LINK_TEXT
    })
}

/// Read the analytics fields of one overlay card.
///
/// Returns `None` when the card cannot be read for this id at all.
pub fn extract_overlay(page: &Page, overlay: ElementRef, id: &str) -> Option<OverlayAnalyticsRecord> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        tracing::error!("cannot read overlay for malformed listing id '{}'", id);
        return None;
    }

    Some(OverlayAnalyticsRecord {
        id: id.to_string(),
        url: listing_url(page, overlay, id),
        sold_24h: tooltip_value(overlay, SOLD_TOOLTIP),
        views_24h: tooltip_value(overlay, VIEWS_TOOLTIP),
        conversion_rate: tooltip_value(overlay, CONVERSION_TOOLTIP),
        tags: copied_tags(overlay),
        main_image: None,
        sku: None,
    })
}

fn tooltip_value(overlay: ElementRef, phrase: &str) -> String {
    overlay
        .select(&TOOLTIP)
        .find(|tip| tip.text().collect::<String>().contains(phrase))
        .and_then(|tip| tip.parent().and_then(ElementRef::wrap))
        .and_then(|parent| parent.select(&VALUE).next())
        .map(|value| text_of(&value))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn copied_tags(overlay: ElementRef) -> String {
    overlay
        .select(&COPY_BUTTON)
        .next()
        .and_then(|button| button.value().attr("onclick"))
        .and_then(|handler| WRITE_TEXT_ARG.captures(handler))
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Listing URL truncated right after `/listing/{id}`.
fn listing_url(page: &Page, overlay: ElementRef, id: &str) -> String {
    let segment = format!("/listing/{}", id);
    let needle = format!("{}/", segment);

    let Some(href) = overlay
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains(&needle))
    else {
        return NOT_AVAILABLE.to_string();
    };

    // Resolve first so relative hrefs truncate the same way
    let absolute = page.resolve(href);
    match absolute.find(&segment) {
        Some(pos) => absolute[..pos + segment.len()].to_string(),
        None => absolute,
    }
}

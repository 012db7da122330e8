//! Single-listing extraction
//!
//! Builds a [`ListingRecord`] from the located JSON-LD product plus the
//! rendered page. Optional sub-fields are computed as `Result<_, ParseWarning>`
//! and merged with defaults; only missing structured data or a missing
//! canonical URL fails the call.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::{find_keyed, json_text};
use crate::error::{ExtractError, ParseWarning};
use crate::model::{ListingRecord, ShopInfo, Variation};
use crate::page::{strip_query, text_of, Page};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static OG_URL: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:url"]"#));
static PRICE_TEXT: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[data-appears-component-name="price"] p"#));
static BUY_BOX: LazyLock<Selector> = LazyLock::new(|| selector("div[data-buy-box]"));
static VARIATIONS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[data-appears-component-name="variations"]"#));
static VARIATION_ITEM: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[data-selector="listing-page-variation"]"#));
static VARIATION_LABEL: LazyLock<Selector> = LazyLock::new(|| selector("span[data-label]"));
static SELECT: LazyLock<Selector> = LazyLock::new(|| selector("select"));
static OPTION: LazyLock<Selector> = LazyLock::new(|| selector("option"));
static PERSONALIZATION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[data-appears-component-name="personalization"]"#));
static INSTRUCTIONS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"p[data-instructions=""]"#));
static SHOP_OWNERS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[data-appears-component-name="shop_owners"]"#));
static SHOP_AVATAR: LazyLock<Selector> = LazyLock::new(|| selector(".wt-thumbnail-larger img"));
static SHOP_LINK: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[href*="/shop/"]"#));
static TAG_PANEL: LazyLock<Selector> =
    LazyLock::new(|| selector("div#heyetsy-card-container[data-heyetsy-listing-id]"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));

static DOLLAR_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([\d,.]+)").expect("valid regex"));
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static LISTING_PATH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/listing/(\d+)").expect("valid regex"));

const SUGGESTIONS_LINK_TEXT: &str = "suggestions";

/// Assemble the listing record for a single-listing page.
pub fn extract_listing(product: Option<&Value>, page: &Page) -> Result<ListingRecord, ExtractError> {
    let product = product.ok_or(ExtractError::MissingStructuredData)?;
    let document = page.document();
    let url = canonical_url(document)?;

    let id = listing_id(product, &url).unwrap_or_else(|| {
        tracing::warn!("listing has neither a sku nor a /listing/ id in '{}'", url);
        String::new()
    });

    // Rendered price wins over the offer
    let price = settle("rendered price", rendered_price(document))
        .or_else(|| offer_field(product, "price"))
        .or_else(|| offer_field(product, "highPrice"));

    let (variation, personalization) = match document.select(&BUY_BOX).next() {
        Some(buy_box) => (variations(buy_box), personalization(buy_box)),
        None => {
            tracing::debug!("no buy box on page; variations and personalization left empty");
            (Vec::new(), Vec::new())
        }
    };

    let tags = settle("tags", suggestion_tags(document, &id)).filter(|tags| !tags.is_empty());
    if tags.is_none() {
        tracing::warn!("no tags found for listing {}", id);
    }

    Ok(ListingRecord {
        id,
        url,
        title: json_text(product.get("name")),
        description: json_text(product.get("description")),
        price,
        images: image_urls(product),
        material: json_text(product.get("material")),
        variation: non_empty(variation),
        personalization: non_empty(personalization),
        tags,
        shop: shop_info(page),
    })
}

/// Canonical page URL with the query string removed.
pub fn canonical_url(document: &Html) -> Result<String, ExtractError> {
    let meta = document
        .select(&OG_URL)
        .next()
        .ok_or(ExtractError::MissingCanonicalUrl)?;
    let content = meta.value().attr("content").unwrap_or_default();
    Ok(strip_query(content.trim()).to_string())
}

/// Native listing id: the product `sku`, else the id in the canonical URL.
pub fn listing_id(product: &Value, canonical_url: &str) -> Option<String> {
    json_text(product.get("sku")).or_else(|| {
        LISTING_PATH_ID
            .captures(canonical_url)
            .map(|caps| caps[1].to_string())
    })
}

/// Image URLs in source order, preferring `contentURL` over `url`.
pub fn image_urls(product: &Value) -> Vec<String> {
    let entries: Vec<&Value> = match product.get("image") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
        None => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => {
                json_text(entry.get("contentURL")).or_else(|| json_text(entry.get("url")))
            }
            _ => None,
        })
        .filter(|u| !u.trim().is_empty())
        .collect()
}

fn rendered_price(document: &Html) -> Result<String, ParseWarning> {
    let el = document
        .select(&PRICE_TEXT)
        .next()
        .ok_or(ParseWarning::Absent("rendered price"))?;
    let text = text_of(&el);
    let caps = DOLLAR_AMOUNT
        .captures(&text)
        .ok_or_else(|| ParseWarning::Malformed {
            field: "rendered price",
            reason: format!("no dollar amount in '{}'", text),
        })?;
    Ok(caps[1].replace(',', ""))
}

fn offer_field(product: &Value, key: &str) -> Option<String> {
    let offer = match product.get("offers")? {
        Value::Array(offers) => offers.first()?,
        other => other,
    };
    json_text(offer.get(key)).map(|p| p.replace(',', ""))
}

fn variations(buy_box: ElementRef) -> Vec<Variation> {
    let Some(block) = buy_box.select(&VARIATIONS).next() else {
        return Vec::new();
    };

    block
        .select(&VARIATION_ITEM)
        .filter_map(|item| {
            let label = item.select(&VARIATION_LABEL).next()?;
            let control = item.select(&SELECT).next()?;
            let options: Vec<String> = control
                .select(&OPTION)
                .map(|opt| text_of(&opt))
                // Drop blank entries before the placeholder, not after
                .filter(|text| !text.is_empty())
                .skip(1)
                .collect();
            if options.is_empty() {
                return None;
            }
            Some(Variation {
                label: text_of(&label),
                options,
            })
        })
        .collect()
}

fn personalization(buy_box: ElementRef) -> Vec<String> {
    let Some(instructions) = buy_box
        .select(&PERSONALIZATION)
        .next()
        .and_then(|block| block.select(&INSTRUCTIONS).next())
    else {
        return Vec::new();
    };

    LINE_BREAK
        .split(&instructions.inner_html())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn shop_info(page: &Page) -> ShopInfo {
    let Some(region) = page.document().select(&SHOP_OWNERS).next() else {
        return ShopInfo::default();
    };

    let avatar_url = region
        .select(&SHOP_AVATAR)
        .next()
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .map(|src| page.resolve(src));

    let shop_url = region
        .select(&SHOP_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| strip_query(&page.resolve(href)).to_string())
        .filter(|u| !u.is_empty());

    let name = shop_url
        .as_deref()
        .and_then(|u| u.trim().rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(String::from);

    ShopInfo {
        name,
        url: shop_url,
        avatar_url,
    }
}

fn suggestion_tags(document: &Html, id: &str) -> Result<Vec<String>, ParseWarning> {
    let panel = find_keyed(document, &TAG_PANEL, "data-heyetsy-listing-id", id)
        .ok_or(ParseWarning::Absent("tag side panel"))?;
    let link = panel
        .select(&ANCHOR)
        .find(|a| text_of(a).to_lowercase() == SUGGESTIONS_LINK_TEXT)
        .ok_or(ParseWarning::Absent("tag suggestions link"))?;
    let href = link
        .value()
        .attr("href")
        .ok_or(ParseWarning::Absent("tag suggestions href"))?;
    let raw = tags_param(href).ok_or_else(|| ParseWarning::Malformed {
        field: "tag suggestions href",
        reason: format!("no tags parameter in '{}'", href),
    })?;

    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect())
}

fn tags_param(href: &str) -> Option<String> {
    let query = href.split_once('?').map_or(href, |(_, q)| q);
    let query = query.split('#').next().unwrap_or(query);
    // Percent-decode only; a literal '+' is part of the tag text
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("tags="))
        .map(|value| percent_decode_str(value).decode_utf8_lossy().into_owned())
}

fn settle<T>(field: &str, result: Result<T, ParseWarning>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(ParseWarning::Absent(what)) => {
            tracing::debug!("{}: {} not found", field, what);
            None
        }
        Err(warning) => {
            tracing::warn!("{}: {}", field, warning);
            None
        }
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

//! Records produced by the extractors
//!
//! All records are built fresh per call from the page snapshot and handed to
//! the caller. Field names follow the JSON shape the upload endpoint expects.

use serde::{Deserialize, Serialize};

/// Sentinel used by overlay fields that could not be read.
pub const NOT_AVAILABLE: &str = "N/A";

/// A single listing assembled from JSON-LD plus the rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Decimal string without currency symbol or grouping separators.
    pub price: Option<String>,
    pub images: Vec<String>,
    pub material: Option<String>,
    pub variation: Option<Vec<Variation>>,
    pub personalization: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub shop: ShopInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    pub label: String,
    /// Option labels, placeholder excluded.
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopInfo {
    pub name: Option<String>,
    pub url: Option<String>,
    pub avatar_url: Option<String>,
}

/// Seller analytics read from the overlay fragment of one listing.
///
/// Text fields hold the raw display string or [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayAnalyticsRecord {
    pub id: String,
    pub url: String,
    #[serde(rename = "sold24h")]
    pub sold_24h: String,
    #[serde(rename = "views24h")]
    pub views_24h: String,
    pub conversion_rate: String,
    pub tags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

impl OverlayAnalyticsRecord {
    /// A record with every display field set to the sentinel.
    pub fn unavailable(id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: NOT_AVAILABLE.to_string(),
            sold_24h: NOT_AVAILABLE.to_string(),
            views_24h: NOT_AVAILABLE.to_string(),
            conversion_rate: NOT_AVAILABLE.to_string(),
            tags: NOT_AVAILABLE.to_string(),
            main_image: None,
            sku: None,
        }
    }
}

/// Minimum thresholds for results-page filtering. `None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(default)]
    pub min_conversion_rate: Option<f64>,
    #[serde(default, rename = "minViews24h")]
    pub min_views_24h: Option<f64>,
    #[serde(default, rename = "minSold24h")]
    pub min_sold_24h: Option<f64>,
}

/// Outcome of walking a results page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    NotFound { found: bool },
    Found {
        found: bool,
        records: Vec<OverlayAnalyticsRecord>,
    },
}

impl BatchOutcome {
    pub fn not_found() -> Self {
        BatchOutcome::NotFound { found: false }
    }

    pub fn found(records: Vec<OverlayAnalyticsRecord>) -> Self {
        BatchOutcome::Found {
            found: true,
            records,
        }
    }

    pub fn records(&self) -> Option<&[OverlayAnalyticsRecord]> {
        match self {
            BatchOutcome::NotFound { .. } => None,
            BatchOutcome::Found { records, .. } => Some(records),
        }
    }
}

/// Image-only extraction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSet {
    pub sku: String,
    pub image_urls: Vec<String>,
}

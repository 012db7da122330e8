//! Threshold filtering of overlay analytics

use std::sync::LazyLock;

use regex::Regex;

use crate::extractors::{first_integer, parse_count};
use crate::model::{FilterConfig, OverlayAnalyticsRecord, NOT_AVAILABLE};

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)%").expect("valid regex"));

/// A bound is active only when it is a positive number.
fn active(bound: Option<f64>) -> Option<f64> {
    bound.filter(|b| *b > 0.0)
}

impl FilterConfig {
    /// True when no dimension constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        active(self.min_conversion_rate).is_none()
            && active(self.min_views_24h).is_none()
            && active(self.min_sold_24h).is_none()
    }
}

/// Evaluate every configured dimension and AND the outcomes.
///
/// A field holding the "N/A" sentinel fails any dimension that is configured.
pub fn passes(record: &OverlayAnalyticsRecord, config: &FilterConfig) -> bool {
    if config.is_unconstrained() {
        return true;
    }

    let conversion_ok = active(config.min_conversion_rate)
        .map_or(true, |min| conversion_rate(&record.conversion_rate).is_some_and(|v| v >= min));
    let views_ok = active(config.min_views_24h)
        .map_or(true, |min| available(&record.views_24h).is_some_and(|v| parse_count(v) >= min));
    let sold_ok = active(config.min_sold_24h).map_or(true, |min| {
        available(&record.sold_24h).is_some_and(|v| first_integer(v).unwrap_or(0.0) >= min)
    });

    conversion_ok && views_ok && sold_ok
}

fn available(field: &str) -> Option<&str> {
    if field.is_empty() || field == NOT_AVAILABLE {
        None
    } else {
        Some(field)
    }
}

fn conversion_rate(field: &str) -> Option<f64> {
    let text = available(field)?;
    PERCENT.captures(text)?[1].parse().ok()
}

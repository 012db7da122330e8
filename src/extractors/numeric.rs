//! Human-formatted count parsing ("1,234", "1.2K", "3+", "12.5%")

use std::sync::LazyLock;

use regex::Regex;

use crate::model::NOT_AVAILABLE;

static SUFFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+\.?\d*)([KMB])?$").expect("valid regex"));
static FIRST_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Parse a display count into a number. Never fails; unreadable input is 0.
pub fn parse_count(text: &str) -> f64 {
    if text.is_empty() || text == NOT_AVAILABLE {
        return 0.0;
    }

    let clean: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if let Some(caps) = SUFFIXED.captures(&clean) {
        let mantissa: f64 = caps[1].parse().unwrap_or(0.0);
        let scale = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
            Some(s) if s == "k" => 1e3,
            Some(s) if s == "m" => 1e6,
            Some(s) if s == "b" => 1e9,
            _ => 1.0,
        };
        return mantissa * scale;
    }

    first_integer(&clean).unwrap_or(0.0)
}

/// First contiguous run of ASCII digits, as a whole number.
///
/// Parsed as `f64` so runs too long for any integer type still compare in order.
pub(crate) fn first_integer(text: &str) -> Option<f64> {
    FIRST_DIGITS
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

//! Client-side derivations: sentiment from the VIX reading and simulated chart series.

pub mod sentiment;
pub mod series;

use crate::domain::report::{MarketIndex, StockItem};
use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

pub use sentiment::{classify_vix, RiskInsight, RiskTier, Stance};
pub use series::{price_series, vix_series, PricePoint, VixPoint};

const FALLBACK_PRICE: f64 = 10_000.0;

/// Parses a display string such as `"2,650.45"` or `"71,500원"` by keeping digits and dots,
/// then reading the longest leading number (`"15.50 (+1.2)"` reads as `15.501`).
pub fn parse_display_number(s: &str) -> Option<f64> {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in kept.char_indices() {
        if c == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        }
        end = i + 1;
    }

    let prefix = &kept[..end];
    if !prefix.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Current price used to anchor the simulated chart; unparsable or zero prices fall back.
pub fn current_price_of(item: &StockItem) -> f64 {
    parse_display_number(&item.price)
        .filter(|p| *p != 0.0)
        .unwrap_or(FALLBACK_PRICE)
}

/// Reading of the first index whose name mentions VIX.
pub fn real_vix(indices: &[MarketIndex]) -> Option<f64> {
    indices
        .iter()
        .find(|i| i.name.to_uppercase().contains("VIX"))
        .and_then(|i| parse_display_number(&i.value))
}

/// Index strip shown before any report exists.
pub fn default_indices() -> Vec<MarketIndex> {
    [
        ("KOSPI", "2,650.45", "+0.8%"),
        ("KOSDAQ", "870.12", "+1.2%"),
        ("USD/KRW", "1,345.50", "+0.3%"),
        ("S&P 500", "5,234.18", "+0.5%"),
        ("VIX", "15.50", "-1.2%"),
    ]
    .into_iter()
    .map(|(name, value, change)| MarketIndex {
        name: name.to_string(),
        value: value.to_string(),
        change: change.to_string(),
        is_positive: true,
    })
    .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub indices: Vec<MarketIndex>,
    pub vix_series: Vec<VixPoint>,
    pub latest_vix: f64,
    pub insight: RiskInsight,
}

/// Index strip, VIX chart and strategy card derived from the current indices.
pub fn dashboard_snapshot<R: Rng + ?Sized>(
    rng: &mut R,
    indices: Option<&[MarketIndex]>,
    today: NaiveDate,
) -> DashboardSnapshot {
    let indices = match indices {
        Some(indices) if !indices.is_empty() => indices.to_vec(),
        _ => default_indices(),
    };

    let vix_series = vix_series(rng, today, real_vix(&indices));
    let latest_vix = vix_series.last().map_or(0.0, |p| p.value);

    DashboardSnapshot {
        insight: classify_vix(latest_vix),
        indices,
        vix_series,
        latest_vix,
    }
}

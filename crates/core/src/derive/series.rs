use crate::domain::report::TrendBias;
use crate::time::kr_market::short_label;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;

pub const VIX_DAYS: usize = 365;
const VIX_START: f64 = 18.0;
const VIX_TARGET: f64 = 19.0;
const VIX_REVERSION: f64 = 0.05;
const VIX_MIN: f64 = 10.0;
const VIX_MAX: f64 = 50.0;

pub const PRICE_DAYS: usize = 30;
pub const PRICE_FLOOR: f64 = 100.0;
const PRICE_VOLATILITY: f64 = 0.02;
const PRICE_DRIFT: f64 = 0.003;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VixPoint {
    pub date: NaiveDate,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub label: String,
    pub price: f64,
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// One year of simulated daily VIX readings ending on `end_date`.
///
/// Bounded random walk with mean reversion, clamped to [10, 50]. With a real reading the
/// whole series is shifted so the last point lands on it, then floored at 0.
pub fn vix_series<R: Rng + ?Sized>(
    rng: &mut R,
    end_date: NaiveDate,
    real: Option<f64>,
) -> Vec<VixPoint> {
    let mut value = VIX_START;
    let mut out = Vec::with_capacity(VIX_DAYS);

    for i in 0..VIX_DAYS {
        let date = end_date - Duration::days((VIX_DAYS - 1 - i) as i64);

        value += (rng.gen::<f64>() - 0.5) * 2.0;
        value += (VIX_TARGET - value) * VIX_REVERSION;
        value = value.clamp(VIX_MIN, VIX_MAX);

        out.push(VixPoint {
            label: short_label(date),
            date,
            value: round2(value),
        });
    }

    let last = out.last().map(|p| p.value);
    if let (Some(real), Some(last)) = (real.filter(|r| r.is_finite()), last) {
        let offset = real - last;
        for point in &mut out {
            point.value = round2(point.value + offset).max(0.0);
        }
    }

    out
}

/// One month of simulated closes ending at `current_price` on `end_date`, oldest first.
///
/// Walks backward from today: a gainer is assumed to have been lower in the past, a loser
/// higher. Prices never drop below 100.
pub fn price_series<R: Rng + ?Sized>(
    rng: &mut R,
    end_date: NaiveDate,
    current_price: f64,
    bias: TrendBias,
) -> Vec<PricePoint> {
    let drift = match bias {
        TrendBias::Gainer => -PRICE_DRIFT,
        TrendBias::Loser => PRICE_DRIFT,
        TrendBias::Neutral => 0.0,
    };

    let mut price = current_price.max(PRICE_FLOOR);
    let mut out = Vec::with_capacity(PRICE_DAYS);

    for i in 0..PRICE_DAYS {
        let date = end_date - Duration::days(i as i64);
        out.push(PricePoint {
            label: short_label(date),
            date,
            price: price.round(),
        });

        let change = (rng.gen::<f64>() - 0.5) * price * PRICE_VOLATILITY;
        price = (price - change + price * drift).max(PRICE_FLOOR);
    }

    out.reverse();
    out
}

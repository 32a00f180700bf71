//! Seeded random-walk bar generator for replays and tests.
//!
//! Same seed, same bars. The series is clearly fake: it has no sessions,
//! gaps or weekends.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use meanrev_core::domain::{PriceBar, Timeframe};

/// First bar of every synthetic series.
pub fn synthetic_epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0)
        .single()
        .unwrap_or_default()
}

/// `n` M5 bars starting at `start` price.
///
/// `volatility` is the maximum fractional close-to-close move per bar.
pub fn synthetic_bars(seed: u64, n: usize, start: f64, volatility: f64) -> Vec<PriceBar> {
    synthetic_bars_with(seed, n, start, volatility, Timeframe::M5)
}

pub fn synthetic_bars_with(
    seed: u64,
    n: usize,
    start: f64,
    volatility: f64,
    timeframe: Timeframe,
) -> Vec<PriceBar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let vol = volatility.abs();
    let step = Duration::minutes(timeframe.minutes());
    let epoch = synthetic_epoch();

    let mut bars = Vec::with_capacity(n);
    let mut price = start;
    for i in 0..n {
        let open = price;
        let change = if vol > 0.0 { rng.gen_range(-vol..vol) } else { 0.0 };
        let close = open * (1.0 + change);
        let wick = if vol > 0.0 { rng.gen_range(0.0..vol / 2.0) } else { 0.0 };
        let high = open.max(close) * (1.0 + wick);
        let low = open.min(close) * (1.0 - wick);
        let volume = rng.gen_range(100.0..5_000.0_f64).round();

        bars.push(PriceBar::new(
            epoch + step * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }
    bars
}

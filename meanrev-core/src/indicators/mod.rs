//! Concrete indicator implementations.
//!
//! RSI and ATR follow the venue's Wilder convention exactly, so values computed
//! here match what the venue reports for the same bars. EMA feeds the trend
//! filter. All three implement the `Indicator` trait from
//! `components::indicator` and are recomputed over the bar history each bar.

pub mod atr;
pub mod ema;
pub mod rsi;
pub mod snapshot;

pub use atr::Atr;
pub use ema::Ema;
pub use rsi::Rsi;
pub use snapshot::{IndicatorSet, IndicatorSnapshot};

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low widen the body by
/// 0.0005, volume = 1000. Bars are one minute apart.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::PriceBar> {
    let ohlc: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 0.0005, open.min(close) - 0.0005, close)
        })
        .collect();
    make_ohlc_bars(&ohlc)
}

/// Create bars from explicit (open, high, low, close) tuples, one minute apart.
#[cfg(test)]
pub fn make_ohlc_bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::PriceBar> {
    use crate::domain::PriceBar;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            PriceBar::new(
                base + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

//! Average True Range, Wilder-smoothed in the venue's arithmetic.
//!
//! The first bar has no previous close, so its true range is undefined and the
//! smoothing seed is the mean of TR[1..=period]. ATR is first defined at bar
//! `period`.

use crate::components::indicator::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// A zero period is treated as 1; parameter validation rejects it earlier.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Atr {
    fn label(&self) -> String {
        format!("atr({})", self.period)
    }

    fn first_defined(&self) -> usize {
        self.period
    }

    fn series(&self, bars: &[PriceBar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.period)
    }
}

/// True range per bar; the first entry is NaN.
///
/// A NaN in high, low or the previous close yields NaN rather than letting
/// `f64::max` swallow it.
pub fn true_range(bars: &[PriceBar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    if !bars.is_empty() {
        out.push(f64::NAN);
    }
    out.extend(bars.windows(2).map(|pair| {
        let (prev_close, bar) = (pair[0].close, &pair[1]);
        if bar.high.is_nan() || bar.low.is_nan() || prev_close.is_nan() {
            return f64::NAN;
        }
        let range = bar.high - bar.low;
        range
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs())
    }));
    out
}

/// Wilder smoothing: seed with the mean of the first `period` consecutive
/// defined values, then `avg = (avg * (period - 1) + x) / period`.
///
/// Leading NaNs are skipped when looking for the seed window. Once seeded, a
/// NaN leaves every later entry undefined.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let Some(start) = values
        .windows(period)
        .position(|w| w.iter().all(|v| !v.is_nan()))
    else {
        return out;
    };

    let p = period as f64;
    let seed_end = start + period - 1;
    let mut avg = values[start..=seed_end].iter().sum::<f64>() / p;
    out[seed_end] = avg;

    for (slot, &x) in out[seed_end + 1..].iter_mut().zip(&values[seed_end + 1..]) {
        if x.is_nan() {
            break;
        }
        avg = (avg * (p - 1.0) + x) / p;
        *slot = avg;
    }
    out
}

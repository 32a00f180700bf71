//! Relative Strength Index in the venue's convention.
//!
//! Seeded with the simple mean of the first `period` close-to-close gains and
//! losses, then Wilder-smoothed as `avg = (avg * (period - 1) + x) / period`.
//! RSI is first defined at bar `period` (it needs `period + 1` closes).
//! No losses gives 100; a flat window (no gains, no losses) gives 50.

use crate::components::indicator::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
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

impl Indicator for Rsi {
    fn label(&self) -> String {
        format!("rsi({})", self.period)
    }

    fn first_defined(&self) -> usize {
        self.period
    }

    fn series(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rsi_of_series(&closes, self.period)
    }
}

/// Running Wilder averages of up and down moves.
#[derive(Debug, Clone, Copy)]
struct Averages {
    gain: f64,
    loss: f64,
}

impl Averages {
    fn rsi(&self) -> f64 {
        match (self.gain == 0.0, self.loss == 0.0) {
            (true, true) => 50.0,
            (_, true) => 100.0,
            _ => 100.0 - 100.0 / (1.0 + self.gain / self.loss),
        }
    }

    fn step(&mut self, change: f64, p: f64) {
        self.gain = (self.gain * (p - 1.0) + change.max(0.0)) / p;
        self.loss = (self.loss * (p - 1.0) + (-change).max(0.0)) / p;
    }
}

/// RSI over a plain close series.
///
/// A NaN in the seed window leaves the series undefined; a NaN later leaves
/// every following entry undefined.
pub fn rsi_of_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = changes.split_at(period);
    if seed.iter().any(|c| c.is_nan()) {
        return out;
    }

    let p = period as f64;
    let mut avg = Averages {
        gain: seed.iter().filter(|c| **c > 0.0).sum::<f64>() / p,
        loss: -seed.iter().filter(|c| **c < 0.0).sum::<f64>() / p,
    };
    out[period] = avg.rsi();

    for (slot, &change) in out[period + 1..].iter_mut().zip(rest) {
        if change.is_nan() {
            break;
        }
        avg.step(change, p);
        *slot = avg.rsi();
    }
    out
}

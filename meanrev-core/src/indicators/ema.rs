//! Exponential moving average of closes, used by the trend filter.
//!
//! Factor `2 / (period + 1)`, seeded with the simple mean of the first
//! `period` closes. A NaN inside the seed window leaves the series undefined.

use crate::components::indicator::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ema {
    period: usize,
}

impl Ema {
    /// A zero period is treated as 1; parameter validation rejects it earlier.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn label(&self) -> String {
        format!("ema({})", self.period)
    }

    fn first_defined(&self) -> usize {
        self.period - 1
    }

    fn series(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        self.over(&closes)
    }
}

impl Ema {
    /// EMA over a plain value series.
    pub fn over(&self, values: &[f64]) -> Vec<f64> {
        let mut out = vec![f64::NAN; values.len()];
        if values.len() < self.period {
            return out;
        }
        let (seed_window, rest) = values.split_at(self.period);
        if seed_window.iter().any(|v| v.is_nan()) {
            return out;
        }

        let alpha = self.alpha();
        let mut ema = seed_window.iter().sum::<f64>() / self.period as f64;
        out[self.period - 1] = ema;
        for (slot, &close) in out[self.period..].iter_mut().zip(rest) {
            if close.is_nan() {
                break;
            }
            ema += alpha * (close - ema);
            *slot = ema;
        }
        out
    }
}

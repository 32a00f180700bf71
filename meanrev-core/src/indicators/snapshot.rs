//! Per-bar indicator snapshot consumed by the signal generator, trend filter and
//! trailing stop engine.

use serde::{Deserialize, Serialize};

use super::{Atr, Ema, Rsi};
use crate::components::indicator::{Indicator, IndicatorValues, SeriesKey};
use crate::config::StrategyParameters;
use crate::domain::PriceBar;

/// The indicators a strategy instance needs, configured from one parameter snapshot.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub rsi: Rsi,
    pub atr: Atr,
    pub ema_fast: Ema,
    pub ema_medium: Ema,
    pub ema_slow: Ema,
}

/// Latest indicator readings. `None` means undefined (not enough history).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub rsi_prev: Option<f64>,
    pub rsi_prev2: Option<f64>,
    pub atr: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_medium: Option<f64>,
    pub ema_slow: Option<f64>,
    pub close: Option<f64>,
}

impl IndicatorSet {
    pub fn new(
        rsi_period: usize,
        atr_period: usize,
        fast: usize,
        medium: usize,
        slow: usize,
    ) -> Self {
        Self {
            rsi: Rsi::new(rsi_period),
            atr: Atr::new(atr_period),
            ema_fast: Ema::new(fast),
            ema_medium: Ema::new(medium),
            ema_slow: Ema::new(slow),
        }
    }

    pub fn from_params(params: &StrategyParameters) -> Self {
        Self::new(
            params.rsi_period,
            params.atr_period,
            params.trend.fast_period,
            params.trend.medium_period,
            params.trend.slow_period,
        )
    }

    /// Compute every series over the full history.
    pub fn compute(&self, bars: &[PriceBar]) -> IndicatorValues {
        let mut values = IndicatorValues::new();
        let indicators: [(SeriesKey, &dyn Indicator); 5] = [
            (SeriesKey::Rsi, &self.rsi),
            (SeriesKey::Atr, &self.atr),
            (SeriesKey::EmaFast, &self.ema_fast),
            (SeriesKey::EmaMedium, &self.ema_medium),
            (SeriesKey::EmaSlow, &self.ema_slow),
        ];
        for (key, indicator) in indicators {
            values.insert(key, indicator.series(bars));
        }
        values
    }

    /// Latest readings over `bars`.
    pub fn snapshot(&self, bars: &[PriceBar]) -> IndicatorSnapshot {
        let values = self.compute(bars);
        IndicatorSnapshot {
            rsi: values.latest(SeriesKey::Rsi),
            rsi_prev: values.back(SeriesKey::Rsi, 1),
            rsi_prev2: values.back(SeriesKey::Rsi, 2),
            atr: values.latest(SeriesKey::Atr),
            ema_fast: values.latest(SeriesKey::EmaFast),
            ema_medium: values.latest(SeriesKey::EmaMedium),
            ema_slow: values.latest(SeriesKey::EmaSlow),
            close: bars.last().map(|b| b.close).filter(|c| c.is_finite()),
        }
    }

    /// Bars needed before RSI (current and previous) and ATR are all defined.
    pub fn warmup_bars(&self) -> usize {
        (self.rsi.first_defined() + 2).max(self.atr.first_defined() + 1)
    }
}

impl IndicatorSnapshot {
    /// True once RSI (current and previous) and ATR are defined.
    pub fn is_tradeable(&self) -> bool {
        self.rsi.is_some() && self.rsi_prev.is_some() && self.atr.is_some()
    }

    /// All three trend EMAs, if defined.
    pub fn trend_emas(&self) -> Option<(f64, f64, f64)> {
        Some((self.ema_fast?, self.ema_medium?, self.ema_slow?))
    }
}

//! Indicator trait and the per-bar table of computed series.
//!
//! Indicators are recomputed over the whole bar history on every bar, so the
//! values the engine acts on are exactly what a batch pass over the same bars
//! (a replay, or the venue's own chart) produces.

use std::collections::HashMap;

use crate::domain::PriceBar;

/// A batch indicator over an ordered bar history.
///
/// `series` returns one value per bar. Values before `first_defined()` are
/// `f64::NAN`, and no value at bar t may read bars after t.
pub trait Indicator: Send + Sync {
    /// Label used in logs, e.g. `rsi(14)`.
    fn label(&self) -> String;

    /// Index of the first bar that can carry a defined value.
    fn first_defined(&self) -> usize;

    fn series(&self, bars: &[PriceBar]) -> Vec<f64>;

    /// Value `back` bars before the newest one, `None` when undefined.
    fn value_back(&self, bars: &[PriceBar], back: usize) -> Option<f64> {
        let series = self.series(bars);
        let idx = series.len().checked_sub(back + 1)?;
        series.get(idx).copied().filter(|v| v.is_finite())
    }
}

/// Role a series plays in the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKey {
    Rsi,
    Atr,
    EmaFast,
    EmaMedium,
    EmaSlow,
}

/// Computed series for one bar history, keyed by role.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<SeriesKey, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SeriesKey, values: Vec<f64>) {
        self.series.insert(key, values);
    }

    pub fn series(&self, key: SeriesKey) -> Option<&[f64]> {
        self.series.get(&key).map(Vec::as_slice)
    }

    /// Value `back` bars before the newest bar. Undefined (NaN) maps to `None`.
    pub fn back(&self, key: SeriesKey, back: usize) -> Option<f64> {
        let series = self.series.get(&key)?;
        let idx = series.len().checked_sub(back + 1)?;
        series.get(idx).copied().filter(|v| v.is_finite())
    }

    pub fn latest(&self, key: SeriesKey) -> Option<f64> {
        self.back(key, 0)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_walks_from_the_newest_bar() {
        let mut values = IndicatorValues::new();
        values.insert(SeriesKey::Rsi, vec![f64::NAN, f64::NAN, 31.5, 28.0, 29.0]);
        assert_eq!(values.latest(SeriesKey::Rsi), Some(29.0));
        assert_eq!(values.back(SeriesKey::Rsi, 1), Some(28.0));
        assert_eq!(values.back(SeriesKey::Rsi, 2), Some(31.5));
        assert_eq!(values.back(SeriesKey::Rsi, 3), None);
        assert_eq!(values.back(SeriesKey::Rsi, 9), None);
    }

    #[test]
    fn missing_series_is_undefined() {
        let mut values = IndicatorValues::new();
        values.insert(SeriesKey::Atr, vec![f64::NAN, 0.0012]);
        assert_eq!(values.latest(SeriesKey::Atr), Some(0.0012));
        assert_eq!(values.latest(SeriesKey::EmaSlow), None);
        assert!(values.series(SeriesKey::EmaFast).is_none());
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn infinite_values_are_not_defined() {
        let mut values = IndicatorValues::new();
        values.insert(SeriesKey::EmaFast, vec![f64::INFINITY]);
        assert_eq!(values.latest(SeriesKey::EmaFast), None);
    }
}

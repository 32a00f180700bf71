//! PriceBar: the fundamental market data unit, plus the append-only bar history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// OHLCV bar for the strategy's instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }
    }

    /// Returns true if any OHLCV field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

/// Reasons a bar cannot be appended to the history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar at {timestamp} has NaN fields")]
    Void { timestamp: DateTime<Utc> },
    #[error("bar at {timestamp} violates OHLC relationships")]
    Insane { timestamp: DateTime<Utc> },
    #[error("bar at {timestamp} is not after the last bar at {last}")]
    OutOfOrder {
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

/// Append-only ordered bar sequence with strictly increasing timestamps.
///
/// Bounded by `capacity`: once full, the oldest bar is dropped. Wilder smoothing
/// depends on where the series starts, so the capacity should comfortably
/// exceed the longest indicator period.
#[derive(Debug, Clone)]
pub struct BarHistory {
    bars: VecDeque<PriceBar>,
    capacity: usize,
}

impl BarHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            bars: VecDeque::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
        }
    }

    /// Validate and append a bar.
    pub fn push(&mut self, bar: PriceBar) -> Result<(), BarError> {
        if bar.is_void() {
            return Err(BarError::Void {
                timestamp: bar.timestamp,
            });
        }
        if !bar.is_sane() {
            return Err(BarError::Insane {
                timestamp: bar.timestamp,
            });
        }
        if let Some(last) = self.bars.back() {
            if bar.timestamp <= last.timestamp {
                return Err(BarError::OutOfOrder {
                    timestamp: bar.timestamp,
                    last: last.timestamp,
                });
            }
        }
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        Ok(())
    }

    /// Replace the history with a venue-provided sequence, keeping only the
    /// valid, strictly increasing bars. Returns how many bars were kept.
    pub fn seed(&mut self, bars: impl IntoIterator<Item = PriceBar>) -> usize {
        self.bars.clear();
        bars.into_iter()
            .filter_map(|bar| self.push(bar).ok())
            .count()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.back()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Contiguous view of the bars, oldest first.
    pub fn as_slice(&mut self) -> &[PriceBar] {
        self.bars.make_contiguous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_bar(minute: i64) -> PriceBar {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        PriceBar::new(
            base + Duration::minutes(minute),
            1.1000,
            1.1010,
            1.0990,
            1.1005,
            120.0,
        )
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar(0).is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar(0);
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar(0);
        bar.high = 1.0980;
        assert!(!bar.is_sane());
    }

    #[test]
    fn history_rejects_out_of_order() {
        let mut history = BarHistory::new(10);
        history.push(sample_bar(5)).unwrap();
        let err = history.push(sample_bar(5)).unwrap_err();
        assert!(matches!(err, BarError::OutOfOrder { .. }));
        let err = history.push(sample_bar(1)).unwrap_err();
        assert!(matches!(err, BarError::OutOfOrder { .. }));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_drops_oldest_at_capacity() {
        let mut history = BarHistory::new(3);
        for m in 0..5 {
            history.push(sample_bar(m)).unwrap();
        }
        assert_eq!(history.len(), 3);
        let first = history.as_slice()[0].timestamp;
        assert_eq!(first, sample_bar(2).timestamp);
    }

    #[test]
    fn seed_skips_invalid_bars() {
        let mut history = BarHistory::new(10);
        let mut bad = sample_bar(1);
        bad.low = 2.0;
        let kept = history.seed(vec![sample_bar(0), bad, sample_bar(2), sample_bar(2)]);
        assert_eq!(kept, 2);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar(0);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: PriceBar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}

//! Three-EMA trend filter.
//!
//! Classifies the market from fast/medium/slow EMAs and the last close:
//! - Up: fast > medium > slow and close > fast
//! - Down: fast < medium < slow and close < fast
//! - Sideways: anything else
//!
//! Strength is `Strong` when |fast - slow| / slow exceeds the threshold.
//!
//! Two modes:
//! - `Strict`: a long needs an Up classification, a short needs Down, and a
//!   separation beyond the threshold against the trade always vetoes.
//! - `CounterTrendOnly`: only a strong trend against the trade vetoes; weak
//!   or sideways markets allow both directions.
//!
//! Undefined EMAs pass: there is not enough history to judge the trend.

use serde::{Deserialize, Serialize};

use super::{FilterVerdict, SignalFilter};
use crate::components::signal::VetoReason;
use crate::domain::Direction;
use crate::indicators::IndicatorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrength {
    Strong,
    Weak,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendFilterMode {
    #[default]
    Strict,
    CounterTrendOnly,
}

/// Trend classification at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    pub direction: TrendDirection,
    pub strength: TrendStrength,
    /// |fast - slow| / slow.
    pub separation: f64,
}

impl TrendState {
    pub fn classify(fast: f64, medium: f64, slow: f64, close: f64, threshold: f64) -> Self {
        let separation = if slow != 0.0 {
            (fast - slow).abs() / slow
        } else {
            0.0
        };
        let direction = if fast > medium && medium > slow && close > fast {
            TrendDirection::Up
        } else if fast < medium && medium < slow && close < fast {
            TrendDirection::Down
        } else {
            TrendDirection::Sideways
        };
        let strength = match direction {
            TrendDirection::Sideways => TrendStrength::Neutral,
            _ if separation > threshold => TrendStrength::Strong,
            _ => TrendStrength::Weak,
        };
        Self {
            direction,
            strength,
            separation,
        }
    }

    /// Classify from a snapshot; `None` while any EMA or the close is undefined.
    pub fn from_snapshot(snapshot: &IndicatorSnapshot, threshold: f64) -> Option<Self> {
        let (fast, medium, slow) = snapshot.trend_emas()?;
        Some(Self::classify(fast, medium, slow, snapshot.close?, threshold))
    }

    pub fn supports(&self, direction: Direction) -> bool {
        matches!(
            (self.direction, direction),
            (TrendDirection::Up, Direction::Long) | (TrendDirection::Down, Direction::Short)
        )
    }
}

#[derive(Debug, Clone)]
pub struct TrendFilter {
    pub strength_threshold: f64,
    pub mode: TrendFilterMode,
}

impl TrendFilter {
    pub fn new(strength_threshold: f64, mode: TrendFilterMode) -> Self {
        Self {
            strength_threshold,
            mode,
        }
    }

    fn evaluate_strict(
        &self,
        direction: Direction,
        fast: f64,
        slow: f64,
        state: &TrendState,
    ) -> FilterVerdict {
        // Signed separation in the trade's favour; negative means against it.
        let with_trade = direction.favourable(slow, fast) / slow;
        if -with_trade > self.strength_threshold {
            return FilterVerdict::Vetoed(VetoReason::StrongCounterTrend {
                separation: state.separation,
            });
        }
        if state.supports(direction) {
            FilterVerdict::Passed
        } else {
            FilterVerdict::Vetoed(VetoReason::TrendMisaligned)
        }
    }

    fn evaluate_counter_trend(&self, direction: Direction, state: &TrendState) -> FilterVerdict {
        let opposing = match direction {
            Direction::Long => TrendDirection::Down,
            Direction::Short => TrendDirection::Up,
        };
        if state.direction == opposing && state.strength == TrendStrength::Strong {
            FilterVerdict::Vetoed(VetoReason::StrongCounterTrend {
                separation: state.separation,
            })
        } else {
            FilterVerdict::Passed
        }
    }
}

impl SignalFilter for TrendFilter {
    fn name(&self) -> &str {
        "trend_filter"
    }

    fn evaluate(&self, direction: Direction, snapshot: &IndicatorSnapshot) -> FilterVerdict {
        let Some(state) = TrendState::from_snapshot(snapshot, self.strength_threshold) else {
            return FilterVerdict::Passed;
        };
        match self.mode {
            TrendFilterMode::Strict => {
                let (fast, _, slow) = match snapshot.trend_emas() {
                    Some(emas) if emas.2 != 0.0 => emas,
                    _ => return FilterVerdict::Passed,
                };
                self.evaluate_strict(direction, fast, slow, &state)
            }
            TrendFilterMode::CounterTrendOnly => self.evaluate_counter_trend(direction, &state),
        }
    }
}

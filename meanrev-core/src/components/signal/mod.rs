//! Signal generation: turns RSI readings into directional entry intent, and
//! decides when an open position should exit on RSI.
//!
//! Signal generators are pure: they see only the latest indicator readings,
//! never position or account state. Whether a position is already open is
//! decided by `evaluate_entry`, which wraps the generator and the optional
//! trend filter.

pub mod basic;
pub mod exit;
pub mod momentum;

pub use basic::BasicRsiSignal;
pub use exit::RsiExit;
pub use momentum::MomentumRsiSignal;

use serde::{Deserialize, Serialize};
use std::fmt;

use super::filter::{FilterVerdict, SignalFilter};
use crate::config::{SignalPolicy, StrategyParameters};
use crate::domain::Direction;
use crate::indicators::IndicatorSnapshot;

/// What the generator asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    None,
    EnterLong,
    EnterShort,
}

impl SignalKind {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::None => None,
            Self::EnterLong => Some(Direction::Long),
            Self::EnterShort => Some(Direction::Short),
        }
    }
}

impl From<Direction> for SignalKind {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Long => Self::EnterLong,
            Direction::Short => Self::EnterShort,
        }
    }
}

/// Why a candidate entry was not taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum VetoReason {
    /// RSI was oversold on the previous bar but has left the zone.
    NotOversold,
    /// RSI was overbought on the previous bar but has left the zone.
    NotOverbought,
    /// Only the current bar is beyond the threshold.
    SingleBarTouch,
    /// RSI did not turn by more than the momentum threshold.
    InsufficientMomentum { delta: f64, required: f64 },
    /// RSI at or below the extreme floor (long side).
    FallingKnife,
    /// RSI at or above the mirrored ceiling (short side).
    RisingKnife,
    /// EMA ordering does not support the direction.
    TrendMisaligned,
    /// A strong trend runs against the direction.
    StrongCounterTrend { separation: f64 },
    PositionOpen,
    IndicatorUndefined,
}

impl VetoReason {
    /// Stable snake_case code used in events and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotOversold => "not_oversold",
            Self::NotOverbought => "not_overbought",
            Self::SingleBarTouch => "single_bar_touch",
            Self::InsufficientMomentum { .. } => "insufficient_momentum",
            Self::FallingKnife => "falling_knife",
            Self::RisingKnife => "rising_knife",
            Self::TrendMisaligned => "trend_misaligned",
            Self::StrongCounterTrend { .. } => "strong_counter_trend",
            Self::PositionOpen => "position_open",
            Self::IndicatorUndefined => "indicator_undefined",
        }
    }
}

impl fmt::Display for VetoReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientMomentum { delta, required } => {
                write!(f, "insufficient_momentum (delta {delta:.2}, required > {required:.2})")
            }
            Self::StrongCounterTrend { separation } => {
                write!(f, "strong_counter_trend (separation {separation:.5})")
            }
            other => f.write_str(other.code()),
        }
    }
}

/// Generator output: a kind plus an optional veto explaining a rejected candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub veto: Option<VetoReason>,
}

impl Signal {
    pub fn none() -> Self {
        Self {
            kind: SignalKind::None,
            veto: None,
        }
    }

    pub fn enter(direction: Direction) -> Self {
        Self {
            kind: direction.into(),
            veto: None,
        }
    }

    pub fn vetoed(reason: VetoReason) -> Self {
        Self {
            kind: SignalKind::None,
            veto: Some(reason),
        }
    }

    pub fn is_entry(&self) -> bool {
        self.kind != SignalKind::None
    }
}

/// RSI readings a generator decides on. `previous2` is informational.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiReadings {
    pub current: f64,
    pub previous: f64,
    pub previous2: Option<f64>,
}

impl RsiReadings {
    pub fn from_snapshot(snapshot: &IndicatorSnapshot) -> Option<Self> {
        Some(Self {
            current: snapshot.rsi?,
            previous: snapshot.rsi_prev?,
            previous2: snapshot.rsi_prev2,
        })
    }
}

/// Trait for entry signal generators.
///
/// Deterministic: the same readings always produce the same signal.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "rsi_basic").
    fn name(&self) -> &str;

    fn evaluate(&self, readings: &RsiReadings) -> Signal;
}

/// Build the generator selected by a parameter snapshot.
pub fn generator_for(params: &StrategyParameters) -> Box<dyn SignalGenerator> {
    match params.signal_policy {
        SignalPolicy::Basic => Box::new(BasicRsiSignal::new(params.oversold, params.overbought)),
        SignalPolicy::MomentumFiltered => Box::new(MomentumRsiSignal::new(
            params.oversold,
            params.overbought,
            params.momentum_threshold,
            params.extreme_floor,
        )),
    }
}

/// Full entry decision for one bar: open-position guard, undefined-indicator
/// guard, generator, then the optional filter.
pub fn evaluate_entry(
    generator: &dyn SignalGenerator,
    filter: Option<&dyn SignalFilter>,
    snapshot: &IndicatorSnapshot,
    position_open: bool,
) -> Signal {
    if position_open {
        return Signal::vetoed(VetoReason::PositionOpen);
    }
    let Some(readings) = RsiReadings::from_snapshot(snapshot) else {
        return Signal::vetoed(VetoReason::IndicatorUndefined);
    };

    let signal = generator.evaluate(&readings);
    let (Some(direction), Some(filter)) = (signal.kind.direction(), filter) else {
        return signal;
    };

    match filter.evaluate(direction, snapshot) {
        FilterVerdict::Passed => signal,
        FilterVerdict::Vetoed(reason) => Signal::vetoed(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::filter::{TrendFilter, TrendFilterMode};

    fn snapshot(rsi: f64, prev: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: Some(rsi),
            rsi_prev: Some(prev),
            rsi_prev2: Some(prev),
            atr: Some(0.0010),
            close: Some(1.1000),
            ..Default::default()
        }
    }

    #[test]
    fn position_open_blocks_signal() {
        let gen = BasicRsiSignal::new(30.0, 70.0);
        let sig = evaluate_entry(&gen, None, &snapshot(10.0, 10.0), true);
        assert_eq!(sig, Signal::vetoed(VetoReason::PositionOpen));
    }

    #[test]
    fn undefined_rsi_is_vetoed() {
        let gen = BasicRsiSignal::new(30.0, 70.0);
        let mut snap = snapshot(25.0, 25.0);
        snap.rsi_prev = None;
        let sig = evaluate_entry(&gen, None, &snap, false);
        assert_eq!(sig.veto, Some(VetoReason::IndicatorUndefined));
        assert!(!sig.is_entry());
    }

    #[test]
    fn filter_veto_replaces_entry() {
        let gen = BasicRsiSignal::new(30.0, 70.0);
        let filter = TrendFilter::new(0.002, TrendFilterMode::Strict);
        let mut snap = snapshot(25.0, 25.0);
        // Strong downtrend: fast < medium < slow, price below fast
        snap.ema_fast = Some(1.0900);
        snap.ema_medium = Some(1.0950);
        snap.ema_slow = Some(1.1000);
        snap.close = Some(1.0890);
        let sig = evaluate_entry(&gen, Some(&filter), &snap, false);
        assert!(!sig.is_entry());
        assert!(matches!(
            sig.veto,
            Some(VetoReason::StrongCounterTrend { .. })
        ));
    }

    #[test]
    fn no_candidate_skips_filter() {
        let gen = BasicRsiSignal::new(30.0, 70.0);
        let filter = TrendFilter::new(0.002, TrendFilterMode::Strict);
        let sig = evaluate_entry(&gen, Some(&filter), &snapshot(50.0, 50.0), false);
        assert_eq!(sig, Signal::none());
    }

    #[test]
    fn generator_for_selects_policy() {
        let mut params = StrategyParameters::default();
        params.signal_policy = SignalPolicy::Basic;
        assert_eq!(generator_for(&params).name(), "rsi_basic");
        params.signal_policy = SignalPolicy::MomentumFiltered;
        assert_eq!(generator_for(&params).name(), "rsi_momentum");
    }

    #[test]
    fn veto_reason_serializes_tagged() {
        let json = serde_json::to_string(&VetoReason::InsufficientMomentum {
            delta: 1.0,
            required: 2.0,
        })
        .unwrap();
        assert!(json.contains("\"reason\":\"insufficient_momentum\""));
        assert_eq!(VetoReason::FallingKnife.code(), "falling_knife");
    }
}

//! Strategy parameters and per-instance configuration.
//!
//! `StrategyParameters` is an immutable snapshot: the orchestrator loads one at
//! the start of each bar and positions keep the trailing engine built from the
//! snapshot they were opened under. `fingerprint()` identifies a snapshot in
//! logs (BLAKE3 of its canonical JSON).

pub mod store;

pub use store::ParameterStore;

use serde::{Deserialize, Serialize};

use crate::components::TrendFilterMode;
use crate::domain::{InstrumentSpec, OwnerTag, ParamsFingerprint, Timeframe};
use crate::engine::RetryPolicy;
use crate::error::ConfigError;
use crate::risk::RiskLimits;
use crate::trailing::{TrailingMultiples, TrailingStopEngine, TrailingVariant};

/// Entry signal policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPolicy {
    Basic,
    #[default]
    MomentumFiltered,
}

/// Three-EMA trend filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendFilterConfig {
    pub enabled: bool,
    pub fast_period: usize,
    pub medium_period: usize,
    pub slow_period: usize,
    /// |fast - slow| / slow above this is a strong trend.
    pub strength_threshold: f64,
    pub mode: TrendFilterMode,
}

impl Default for TrendFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fast_period: 20,
            medium_period: 50,
            slow_period: 200,
            strength_threshold: 0.002,
            mode: TrendFilterMode::Strict,
        }
    }
}

/// Hot-reloadable strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParameters {
    pub rsi_period: usize,
    pub atr_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub signal_policy: SignalPolicy,
    /// Minimum RSI turn (points) the momentum policy requires.
    pub momentum_threshold: f64,
    /// Longs need RSI above this; shorts need RSI below `100 - extreme_floor`.
    pub extreme_floor: f64,
    /// Close an open position once RSI crosses `exit_level`.
    pub exit_on_rsi: bool,
    /// Longs exit above this level, shorts below it.
    pub exit_level: f64,
    pub trend: TrendFilterConfig,
    pub trailing_variant: TrailingVariant,
    /// Overrides for the variant's multiples.
    pub breakeven_multiple: Option<f64>,
    pub trail_multiple: Option<f64>,
    pub hard_stop_multiple: Option<f64>,
    /// Breakeven stop offset from entry, in ATR.
    pub breakeven_buffer: f64,
    /// Requested risk per trade, percent of balance.
    pub risk_percent: f64,
    pub risk: RiskLimits,
}

impl Default for StrategyParameters {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            atr_period: 14,
            oversold: 30.0,
            overbought: 70.0,
            signal_policy: SignalPolicy::MomentumFiltered,
            momentum_threshold: 2.0,
            extreme_floor: 15.0,
            exit_on_rsi: true,
            exit_level: 50.0,
            trend: TrendFilterConfig::default(),
            trailing_variant: TrailingVariant::CustomBalanced,
            breakeven_multiple: None,
            trail_multiple: None,
            hard_stop_multiple: None,
            breakeven_buffer: 0.1,
            risk_percent: 1.0,
            risk: RiskLimits::default(),
        }
    }
}

impl StrategyParameters {
    /// Variant multiples with any explicit overrides applied.
    pub fn trailing_multiples(&self) -> TrailingMultiples {
        let preset = self.trailing_variant.multiples();
        TrailingMultiples {
            breakeven_trigger: self.breakeven_multiple.unwrap_or(preset.breakeven_trigger),
            trail_distance: self.trail_multiple.unwrap_or(preset.trail_distance),
            hard_stop_distance: self.hard_stop_multiple.unwrap_or(preset.hard_stop_distance),
        }
    }

    /// Trailing engine for a position opened under this snapshot.
    pub fn trailing_engine(&self) -> TrailingStopEngine {
        TrailingStopEngine::new(
            self.trailing_variant,
            self.trailing_multiples(),
            self.breakeven_buffer,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rsi_period == 0 {
            return Err(ConfigError::NonPositive {
                field: "rsi_period",
                value: 0.0,
            });
        }
        if self.atr_period == 0 {
            return Err(ConfigError::NonPositive {
                field: "atr_period",
                value: 0.0,
            });
        }
        in_range("oversold", self.oversold, 0.0, 100.0)?;
        in_range("overbought", self.overbought, 0.0, 100.0)?;
        if self.oversold >= self.overbought {
            return Err(ConfigError::ThresholdOrder {
                oversold: self.oversold,
                overbought: self.overbought,
            });
        }
        in_range("exit_level", self.exit_level, self.oversold, self.overbought)?;
        in_range("momentum_threshold", self.momentum_threshold, 0.0, 100.0)?;
        in_range("extreme_floor", self.extreme_floor, 0.0, 50.0)?;

        let t = &self.trend;
        if t.fast_period == 0 || t.fast_period >= t.medium_period || t.medium_period >= t.slow_period {
            return Err(ConfigError::TrendPeriodOrder {
                fast: t.fast_period,
                medium: t.medium_period,
                slow: t.slow_period,
            });
        }
        in_range("trend.strength_threshold", t.strength_threshold, 0.0, 1.0)?;

        let m = self.trailing_multiples();
        positive("breakeven_multiple", m.breakeven_trigger)?;
        positive("trail_multiple", m.trail_distance)?;
        positive("hard_stop_multiple", m.hard_stop_distance)?;
        // The breakeven stop must sit below the price that triggers it
        if !(self.breakeven_buffer >= 0.0 && self.breakeven_buffer < m.breakeven_trigger) {
            return Err(ConfigError::OutOfRange {
                field: "breakeven_buffer",
                value: self.breakeven_buffer,
                min: 0.0,
                max: m.breakeven_trigger,
            });
        }

        positive("risk_percent", self.risk_percent)?;
        in_range("risk_percent", self.risk_percent, 0.0, 100.0)?;
        self.risk.validate()
    }

    /// BLAKE3 of the canonical JSON encoding.
    pub fn fingerprint(&self) -> ParamsFingerprint {
        let json = serde_json::to_vec(self).unwrap_or_default();
        ParamsFingerprint::from_bytes(&json)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Fixed per-instance settings. Not hot-reloadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub instrument: InstrumentSpec,
    pub timeframe: Timeframe,
    pub owner: OwnerTag,
    /// Bars kept in memory; oldest are dropped beyond this.
    pub history_capacity: usize,
    /// Bars requested from the venue on warm-up.
    pub warmup_bars: usize,
    pub stop_retry: RetryPolicy,
}

impl InstanceConfig {
    pub fn new(instrument: InstrumentSpec, timeframe: Timeframe, owner: OwnerTag) -> Self {
        Self {
            instrument,
            timeframe,
            owner,
            history_capacity: 1_000,
            warmup_bars: 500,
            stop_retry: RetryPolicy::default(),
        }
    }
}

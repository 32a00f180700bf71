//! Serializable replay configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use meanrev_core::config::{InstanceConfig, StrategyParameters};
use meanrev_core::domain::{InstrumentSpec, OwnerTag, Timeframe};
use meanrev_core::engine::RetryPolicy;
use meanrev_core::error::{ConfigError as ParamError, EngineError};

/// Errors from loading or running a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to parse replay config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamError),
    #[error("invalid replay config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Everything needed to reproduce one replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayConfig {
    pub instrument: InstrumentSpec,
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_balance")]
    pub initial_balance: f64,
    /// Leading bars used to seed history instead of being traded.
    #[serde(default)]
    pub warmup_bars: usize,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Venue minimum stop distance in price units.
    #[serde(default)]
    pub min_stop_distance: f64,
    /// Stop modifications the venue rejects before recovering.
    #[serde(default)]
    pub injected_modify_failures: u32,
    #[serde(default)]
    pub stop_retry: RetryPolicy,
    /// Close whatever is still open at the last bar's close.
    #[serde(default = "default_true")]
    pub liquidate_at_end: bool,
    #[serde(default)]
    pub strategy: StrategyParameters,
}

fn default_timeframe() -> Timeframe {
    Timeframe::M5
}

fn default_owner() -> String {
    "replay".into()
}

fn default_balance() -> f64 {
    10_000.0
}

fn default_history_capacity() -> usize {
    1_000
}

fn default_true() -> bool {
    true
}

impl ReplayConfig {
    pub fn new(instrument: InstrumentSpec) -> Self {
        Self {
            instrument,
            timeframe: default_timeframe(),
            owner: default_owner(),
            initial_balance: default_balance(),
            warmup_bars: 0,
            history_capacity: default_history_capacity(),
            min_stop_distance: 0.0,
            injected_modify_failures: 0,
            stop_retry: RetryPolicy::default(),
            liquidate_at_end: true,
            strategy: StrategyParameters::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ReplayError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReplayError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(ReplayError::Invalid(format!(
                "initial_balance must be positive (got {})",
                self.initial_balance
            )));
        }
        if !self.instrument.is_valid() {
            return Err(ReplayError::Invalid(format!(
                "instrument {} has invalid contract data",
                self.instrument.symbol
            )));
        }
        if self.history_capacity == 0 {
            return Err(ReplayError::Invalid("history_capacity must be at least 1".into()));
        }
        if !(self.min_stop_distance.is_finite() && self.min_stop_distance >= 0.0) {
            return Err(ReplayError::Invalid(format!(
                "min_stop_distance must be non-negative (got {})",
                self.min_stop_distance
            )));
        }
        self.strategy.validate()?;
        Ok(())
    }

    pub fn instance_config(&self) -> InstanceConfig {
        InstanceConfig {
            history_capacity: self.history_capacity,
            warmup_bars: self.warmup_bars,
            stop_retry: self.stop_retry,
            ..InstanceConfig::new(
                self.instrument.clone(),
                self.timeframe,
                OwnerTag::new(self.owner.clone()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meanrev_core::config::SignalPolicy;
    use meanrev_core::trailing::TrailingVariant;

    const DOC: &str = r#"
        timeframe = "M15"
        owner = "eurusd-m15"
        initial_balance = 25000.0
        warmup_bars = 200

        [instrument]
        symbol = "EURUSD"
        point_size = 0.0001
        value_per_point = 10.0
        min_volume = 0.01
        volume_step = 0.01
        max_volume = 50.0

        [strategy]
        rsi_period = 9
        signal_policy = "basic"
        trailing_variant = "patient_wide"
        risk_percent = 0.5
    "#;

    #[test]
    fn parses_partial_document_with_defaults() {
        let config = ReplayConfig::from_toml(DOC).unwrap();
        assert_eq!(config.timeframe, Timeframe::M15);
        assert_eq!(config.owner, "eurusd-m15");
        assert_eq!(config.warmup_bars, 200);
        assert!(config.liquidate_at_end);
        assert_eq!(config.stop_retry, RetryPolicy::default());
        assert_eq!(config.strategy.rsi_period, 9);
        assert_eq!(config.strategy.atr_period, 14);
        assert_eq!(config.strategy.signal_policy, SignalPolicy::Basic);
        assert_eq!(config.strategy.trailing_variant, TrailingVariant::PatientWide);

        let instance = config.instance_config();
        assert_eq!(instance.owner, OwnerTag::new("eurusd-m15"));
        assert_eq!(instance.warmup_bars, 200);
    }

    #[test]
    fn invalid_strategy_is_rejected() {
        let doc = DOC.replace("rsi_period = 9", "rsi_period = 0");
        assert!(matches!(
            ReplayConfig::from_toml(&doc),
            Err(ReplayError::Params(_))
        ));
    }

    #[test]
    fn negative_balance_is_rejected() {
        let mut config = ReplayConfig::new(InstrumentSpec::forex_major("EURUSD"));
        config.initial_balance = -1.0;
        assert!(matches!(config.validate(), Err(ReplayError::Invalid(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ReplayConfig::from_toml("instrument = 3"),
            Err(ReplayError::Parse(_))
        ));
    }
}

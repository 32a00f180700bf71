//! Exposure limits applied by the risk evaluator.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-trade and portfolio exposure limits. All percentages are of account balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Requested risk percent is clamped to this.
    pub max_risk_percent_per_position: f64,
    /// Sum of committed risk percent across an owner's open positions.
    pub portfolio_risk_ceiling_percent: f64,
    /// Volume cap as a percentage of balance (balance × pct / 100 volume units).
    pub dynamic_max_percent: f64,
    /// Absolute volume cap; overrides the dynamic cap when lower.
    pub absolute_max_volume: Option<f64>,
    /// Widest stop distance (price units) a trade may carry.
    pub max_stop_distance: Option<f64>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_risk_percent_per_position: 2.0,
            portfolio_risk_ceiling_percent: 5.0,
            dynamic_max_percent: 0.1,
            absolute_max_volume: None,
            max_stop_distance: None,
        }
    }
}

impl RiskLimits {
    /// Maximum volume for `balance` before instrument limits.
    pub fn dynamic_max_volume(&self, balance: f64) -> f64 {
        let dynamic = balance * self.dynamic_max_percent / 100.0;
        match self.absolute_max_volume {
            Some(abs) => dynamic.min(abs),
            None => dynamic,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percent("max_risk_percent_per_position", self.max_risk_percent_per_position)?;
        check_percent("portfolio_risk_ceiling_percent", self.portfolio_risk_ceiling_percent)?;
        check_percent("dynamic_max_percent", self.dynamic_max_percent)?;
        if let Some(v) = self.absolute_max_volume {
            check_positive("absolute_max_volume", v)?;
        }
        if let Some(v) = self.max_stop_distance {
            check_positive("max_stop_distance", v)?;
        }
        Ok(())
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn check_percent(field: &'static str, value: f64) -> Result<(), ConfigError> {
    check_positive(field, value)?;
    if value > 100.0 {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(())
}

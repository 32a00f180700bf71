//! RSI exit rule.
//!
//! A long leaves once RSI rises above the exit level and a short once it falls
//! below it. A reading exactly at the level holds the position.

use crate::config::StrategyParameters;
use crate::domain::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiExit {
    level: f64,
}

impl RsiExit {
    pub fn new(level: f64) -> Self {
        Self { level }
    }

    /// The rule selected by a parameter snapshot, if exits are enabled.
    pub fn from_params(params: &StrategyParameters) -> Option<Self> {
        params.exit_on_rsi.then(|| Self::new(params.exit_level))
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn should_exit(&self, direction: Direction, rsi: f64) -> bool {
        match direction {
            Direction::Long => rsi > self.level,
            Direction::Short => rsi < self.level,
        }
    }
}

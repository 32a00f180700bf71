//! Stop adjustment history and summary statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Position, StopStage};

/// Why the stop moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Profit reached the breakeven trigger.
    Breakeven,
    /// Trail candidate tightened the stop.
    Trailing,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Breakeven => f.write_str("breakeven"),
            Self::Trailing => f.write_str("trailing"),
        }
    }
}

/// One recorded stop adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopChange {
    pub previous: f64,
    pub new: f64,
    pub stage: StopStage,
    pub reason: StopReason,
    /// Running extreme when the change was made.
    pub extreme: f64,
    pub atr: f64,
}

/// Summary of a position's stop management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopStatistics {
    pub total_adjustments: usize,
    pub breakeven_triggered: bool,
    pub initial_stop: f64,
    pub final_stop: f64,
    pub extreme: f64,
    pub final_stage: StopStage,
    /// Favourable distance locked in by the final stop (negative if none).
    pub locked_distance: f64,
}

impl StopStatistics {
    pub fn of(position: &Position) -> Self {
        Self {
            total_adjustments: position.stop_history.len(),
            breakeven_triggered: position.stage >= StopStage::Breakeven,
            initial_stop: position.initial_stop,
            final_stop: position.stop_price,
            extreme: position.extreme_price,
            final_stage: position.stage,
            locked_distance: position.locked_distance(),
        }
    }
}

//! Position: the single open trade owned by a strategy instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::PositionId;
use crate::trailing::{StopChange, TrailingVariant};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Multiplying a price move by the sign turns it
    /// into "favourable" distance.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    /// Signed favourable excursion of `price` relative to `reference`.
    pub fn favourable(self, reference: f64, price: f64) -> f64 {
        (price - reference) * self.sign()
    }

    /// Returns true if `candidate` is a tighter (more protective) stop than `current`.
    pub fn is_tighter(self, candidate: f64, current: f64) -> bool {
        match self {
            Self::Long => candidate > current,
            Self::Short => candidate < current,
        }
    }

    /// The more protective of two stops.
    pub fn tighter_of(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Long => a.max(b),
            Self::Short => a.min(b),
        }
    }

    /// The more favourable of two prices (running extreme).
    pub fn extreme_of(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Long => a.max(b),
            Self::Short => a.min(b),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => f.write_str("long"),
            Self::Short => f.write_str("short"),
        }
    }
}

/// Stop-management stage. Ordered: transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStage {
    HardStop,
    Breakeven,
    Trailing,
}

impl fmt::Display for StopStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardStop => f.write_str("hard_stop"),
            Self::Breakeven => f.write_str("breakeven"),
            Self::Trailing => f.write_str("trailing"),
        }
    }
}

/// Open position record.
///
/// Created on a confirmed fill. `stop_price`, `extreme_price` and `stage` are
/// written only by the trailing stop engine; closure is handled by the
/// orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub volume: f64,
    pub initial_stop: f64,
    pub stop_price: f64,
    /// Highest price since entry for longs, lowest for shorts.
    pub extreme_price: f64,
    pub stage: StopStage,
    pub variant: TrailingVariant,
    /// Risk percent committed against the portfolio ceiling at entry.
    pub committed_risk_percent: f64,
    pub stop_history: Vec<StopChange>,
}

/// Fields known at fill time.
#[derive(Debug, Clone)]
pub struct Fill {
    pub id: PositionId,
    pub instrument: String,
    pub direction: Direction,
    pub price: f64,
    pub time: DateTime<Utc>,
    pub volume: f64,
}

impl Position {
    /// Open a position in the HardStop stage with the extreme at entry.
    pub fn open(
        fill: Fill,
        initial_stop: f64,
        variant: TrailingVariant,
        committed_risk_percent: f64,
    ) -> Self {
        Self {
            id: fill.id,
            instrument: fill.instrument,
            direction: fill.direction,
            entry_price: fill.price,
            entry_time: fill.time,
            volume: fill.volume,
            initial_stop,
            stop_price: initial_stop,
            extreme_price: fill.price,
            stage: StopStage::HardStop,
            variant,
            committed_risk_percent,
            stop_history: Vec::new(),
        }
    }

    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// Favourable price distance from entry (negative when under water).
    pub fn profit_distance(&self, price: f64) -> f64 {
        self.direction.favourable(self.entry_price, price)
    }

    /// Distance the stop currently locks in (negative while below entry for a long).
    pub fn locked_distance(&self) -> f64 {
        self.direction.favourable(self.entry_price, self.stop_price)
    }
}

//! Error taxonomy.
//!
//! Nothing here is fatal. Each variant maps to a recovery:
//! - `DataError`: skip the bar
//! - `ConfigError`: reject the snapshot, keep the previous one
//! - `ExecutionError`: surface it; stop modifications are retried a bounded number of times
//! - `StaleIndicator`: hold the last stop
//!
//! Risk rejections are ordinary decisions (`risk::RejectionReason`), not errors.

use thiserror::Error;

use crate::domain::{BarError, PositionId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error(transparent)]
    Bar(#[from] BarError),
    #[error("venue returned no bars for {instrument}")]
    EmptyHistory { instrument: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be within {min}..={max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("oversold ({oversold}) must be below overbought ({overbought})")]
    ThresholdOrder { oversold: f64, overbought: f64 },
    #[error("trend periods must satisfy fast < medium < slow (got {fast}/{medium}/{slow})")]
    TrendPeriodOrder {
        fast: usize,
        medium: usize,
        slow: usize,
    },
    #[error("parameter store is at version {actual}, expected {expected}")]
    VersionConflict { expected: u64, actual: u64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("venue rejected the request: {0}")]
    Rejected(String),
    #[error("venue unavailable: {0}")]
    Unavailable(String),
    #[error("venue does not know position {0}")]
    UnknownPosition(PositionId),
}

/// An indicator needed for stop management is undefined on this bar.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{indicator} is undefined; holding stop at {held_stop}")]
pub struct StaleIndicator {
    pub indicator: String,
    pub held_stop: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Stale(#[from] StaleIndicator),
    #[error("no open position with id {0}")]
    NoSuchPosition(PositionId),
}

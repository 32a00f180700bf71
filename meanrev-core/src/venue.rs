//! External collaborators consumed by the orchestrator.
//!
//! The core never talks to a broker directly. Connectivity, authentication,
//! reconnection and order transmission live behind these traits.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Fill, OwnerTag, PositionId, PriceBar, Timeframe};
use crate::error::ExecutionError;

/// Market entry request with an attached protective stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryOrder {
    pub instrument: String,
    pub direction: Direction,
    pub volume: f64,
    pub stop_price: f64,
    pub owner: OwnerTag,
    /// Risk percent this entry commits; registries aggregate it per owner.
    pub risk_percent: f64,
}

/// Trading venue: market data, account state, orders, stop modification and closes.
pub trait Venue {
    /// Most recent `count` closed bars, oldest first.
    fn bars(
        &mut self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<PriceBar>, ExecutionError>;

    fn account_balance(&mut self) -> Result<f64, ExecutionError>;

    /// Place a market entry. Returns the confirmed fill.
    fn place_order(&mut self, order: &EntryOrder) -> Result<Fill, ExecutionError>;

    fn modify_stop_loss(&mut self, position: &PositionId, new_stop: f64) -> Result<(), ExecutionError>;

    /// Minimum distance between market price and a stop, in price units.
    fn min_stop_distance(&mut self, instrument: &str) -> Result<f64, ExecutionError>;

    /// Close an open position at market. Returns the closing fill; the
    /// closure itself is still confirmed through the usual closure path.
    fn close_position(&mut self, position: &PositionId) -> Result<Fill, ExecutionError>;
}

/// An open position as the shared registry reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredPosition {
    pub id: PositionId,
    pub owner: OwnerTag,
    pub instrument: String,
    pub direction: Direction,
    pub volume: f64,
    /// Risk percent committed at entry.
    pub risk_percent: f64,
}

/// Cross-instance view of open positions, keyed by owner tag.
///
/// Eventually consistent: another instance's entry may not be visible yet.
pub trait PositionRegistry: Send + Sync {
    fn open_positions(&self, owner: &OwnerTag) -> Result<Vec<RegisteredPosition>, ExecutionError>;
}

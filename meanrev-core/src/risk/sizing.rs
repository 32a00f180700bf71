//! Stop placement and sizing helpers.
//!
//! # Formula
//! ```text
//! risk_amount = balance × risk_percent / 100
//! volume      = risk_amount / (stop_points × value_per_point)
//! ```
//!
//! # Example
//! - Balance: $10,000, risk 1 % ($100)
//! - Stop: 20 pips, $10 per pip per lot
//! - Volume: $100 / (20 × $10) = 0.5 lots

use crate::domain::{Direction, InstrumentSpec};

/// Raw (unrounded) volume that risks exactly `risk_percent` of `balance`.
pub fn raw_volume(
    balance: f64,
    risk_percent: f64,
    stop_distance: f64,
    instrument: &InstrumentSpec,
) -> f64 {
    let risk_amount = balance * risk_percent / 100.0;
    risk_amount / instrument.money_at_risk(stop_distance, 1.0)
}

/// Risk percent of `balance` carried by `volume` with a stop `stop_distance` away.
pub fn risk_percent_of(
    balance: f64,
    stop_distance: f64,
    volume: f64,
    instrument: &InstrumentSpec,
) -> f64 {
    instrument.money_at_risk(stop_distance, volume) / balance * 100.0
}

/// Stop price `distance` away from `entry`, on the losing side.
pub fn stop_price_for(direction: Direction, entry: f64, distance: f64) -> f64 {
    entry - direction.sign() * distance
}

/// A stop is valid when it sits on the losing side of entry and at least
/// `min_distance` away.
pub fn validate_stop(direction: Direction, entry: f64, stop: f64, min_distance: f64) -> bool {
    let distance = direction.favourable(stop, entry);
    distance > 0.0 && distance >= min_distance
}

/// Reward-to-risk ratio. Infinite when the stop sits at entry.
pub fn risk_reward_ratio(entry: f64, stop: f64, target: f64) -> f64 {
    let risk = (entry - stop).abs();
    let reward = (target - entry).abs();
    if risk == 0.0 {
        f64::INFINITY
    } else {
        reward / risk
    }
}

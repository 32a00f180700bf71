//! Trailing stop engine: three-stage, ATR-scaled stop management.
//!
//! Stages: HardStop → Breakeven → Trailing. Transitions only move forward.
//!
//! For a long (shorts mirror):
//! 1. Entry: stop = entry - hard_stop × ATR (never closer than the venue minimum).
//! 2. Every update: extreme = max(extreme, price).
//! 3. HardStop → Breakeven once price - entry ≥ breakeven_trigger × ATR:
//!    stop = entry + buffer × ATR.
//! 4. From Breakeven on: candidate = extreme - trail × ATR, stop = max(stop, candidate).
//!    The first candidate above the breakeven stop moves the stage to Trailing.
//!
//! Breakeven and trailing are both evaluated in the same update, trailing
//! against the post-breakeven stop.
//!
//! A trailing candidate is capped at `price - min_distance` (the venue minimum
//! the engine was opened with). If the capped stop does not tighten the current
//! one, or would sit at or beyond the price, the stop is held. Breakeven is
//! deferred until the breakeven stop itself fits behind the price.
//!
//! The engine is built from a parameter snapshot when the position opens and
//! never changes afterwards; state lives in the `Position` it updates. The
//! ratchet invariant holds: once stage ≥ Breakeven the stop only tightens.

pub mod history;
pub mod preset;

pub use history::{StopChange, StopReason, StopStatistics};
pub use preset::{TrailingMultiples, TrailingVariant};

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Position, StopStage};
use crate::error::StaleIndicator;
use crate::risk::stop_price_for;

/// Float tolerance for the breakeven trigger comparison.
const TRIGGER_EPSILON: f64 = 1e-10;

/// A stop change the venue must be told about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopUpdate {
    pub previous: f64,
    pub stop: f64,
    pub stage: StopStage,
    pub reason: StopReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopEngine {
    variant: TrailingVariant,
    multiples: TrailingMultiples,
    /// Breakeven stop offset from entry, in ATR.
    breakeven_buffer: f64,
    /// Venue minimum distance between price and stop, in price units.
    #[serde(default)]
    min_distance: f64,
}

impl TrailingStopEngine {
    pub fn new(variant: TrailingVariant, multiples: TrailingMultiples, breakeven_buffer: f64) -> Self {
        Self {
            variant,
            multiples,
            breakeven_buffer,
            min_distance: 0.0,
        }
    }

    /// Keep every stop this engine proposes at least `min_distance` behind price.
    pub fn with_min_distance(mut self, min_distance: f64) -> Self {
        self.min_distance = if min_distance.is_finite() {
            min_distance.max(0.0)
        } else {
            0.0
        };
        self
    }

    /// Engine for a preset with its own multiples.
    pub fn from_preset(variant: TrailingVariant, breakeven_buffer: f64) -> Self {
        Self::new(variant, variant.multiples(), breakeven_buffer)
    }

    pub fn variant(&self) -> TrailingVariant {
        self.variant
    }

    pub fn multiples(&self) -> TrailingMultiples {
        self.multiples
    }

    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    /// Initial hard stop for an entry at `entry`.
    ///
    /// The distance is `hard_stop × atr`, widened to `min_distance` if the venue
    /// requires more room.
    pub fn initial_stop(&self, direction: Direction, entry: f64, atr: f64, min_distance: f64) -> f64 {
        let distance = (self.multiples.hard_stop_distance * atr).max(min_distance);
        stop_price_for(direction, entry, distance)
    }

    /// Feed the latest price and ATR.
    ///
    /// Returns `Ok(Some(update))` when the stop changed, `Ok(None)` when it did
    /// not, and `Err(StaleIndicator)` when ATR is undefined (the stop is held;
    /// the running extreme is still tracked).
    pub fn update(
        &self,
        position: &mut Position,
        price: f64,
        atr: Option<f64>,
    ) -> Result<Option<StopUpdate>, StaleIndicator> {
        let direction = position.direction;
        if price.is_finite() {
            position.extreme_price = direction.extreme_of(position.extreme_price, price);
        }

        let atr = match atr {
            Some(a) if a.is_finite() && a > 0.0 && price.is_finite() => a,
            _ => {
                return Err(StaleIndicator {
                    indicator: "atr".into(),
                    held_stop: position.stop_price,
                })
            }
        };

        let previous = position.stop_price;
        let mut last_reason = None;

        if position.stage == StopStage::HardStop
            && position.profit_distance(price) + TRIGGER_EPSILON
                >= self.multiples.breakeven_trigger * atr
        {
            let breakeven =
                position.entry_price + direction.sign() * self.breakeven_buffer * atr;
            // Waits until the full breakeven stop fits behind the price.
            if self.cap(direction, price, breakeven) == Some(breakeven) {
                let stop = direction.tighter_of(position.stop_price, breakeven);
                record(position, stop, StopStage::Breakeven, StopReason::Breakeven, atr);
                last_reason = Some(StopReason::Breakeven);
            }
        }

        if position.stage >= StopStage::Breakeven {
            let candidate =
                position.extreme_price - direction.sign() * self.multiples.trail_distance * atr;
            match self.cap(direction, price, candidate) {
                Some(stop) if direction.is_tighter(stop, position.stop_price) => {
                    record(position, stop, StopStage::Trailing, StopReason::Trailing, atr);
                    last_reason = Some(StopReason::Trailing);
                }
                _ => {}
            }
        }

        Ok(match last_reason {
            Some(reason) if position.stop_price != previous => Some(StopUpdate {
                previous,
                stop: position.stop_price,
                stage: position.stage,
                reason,
            }),
            _ => None,
        })
    }

    /// `stop` pulled back to `min_distance` behind `price`; `None` when the
    /// result would not sit strictly on the protective side of the price.
    fn cap(&self, direction: Direction, price: f64, stop: f64) -> Option<f64> {
        let limit = price - direction.sign() * self.min_distance;
        let capped = if direction.is_tighter(stop, limit) { limit } else { stop };
        (direction.favourable(capped, price) > 0.0).then_some(capped)
    }
}

fn record(position: &mut Position, stop: f64, stage: StopStage, reason: StopReason, atr: f64) {
    position.stop_history.push(StopChange {
        previous: position.stop_price,
        new: stop,
        stage,
        reason,
        extreme: position.extreme_price,
        atr,
    });
    position.stop_price = stop;
    position.stage = position.stage.max(stage);
}

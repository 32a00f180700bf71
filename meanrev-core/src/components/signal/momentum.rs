//! Momentum-filtered RSI signal.
//!
//! Long entry requires all of:
//! - previous RSI < oversold (the zone was held for two bars)
//! - current RSI < oversold
//! - current RSI > previous RSI + momentum threshold (the turn has started)
//! - current RSI > extreme floor (not a falling knife)
//!
//! Short entry mirrors it against overbought and the ceiling `100 - floor`.

use super::{RsiReadings, Signal, SignalGenerator, VetoReason};
use crate::domain::Direction;

#[derive(Debug, Clone)]
pub struct MomentumRsiSignal {
    pub oversold: f64,
    pub overbought: f64,
    pub momentum_threshold: f64,
    pub extreme_floor: f64,
}

impl MomentumRsiSignal {
    pub fn new(oversold: f64, overbought: f64, momentum_threshold: f64, extreme_floor: f64) -> Self {
        Self {
            oversold,
            overbought,
            momentum_threshold,
            extreme_floor,
        }
    }

    pub fn extreme_ceiling(&self) -> f64 {
        100.0 - self.extreme_floor
    }

    fn evaluate_long(&self, r: &RsiReadings) -> Signal {
        if r.previous >= self.oversold {
            return Signal::vetoed(VetoReason::SingleBarTouch);
        }
        if r.current <= self.extreme_floor {
            return Signal::vetoed(VetoReason::FallingKnife);
        }
        let delta = r.current - r.previous;
        if delta <= self.momentum_threshold {
            return Signal::vetoed(VetoReason::InsufficientMomentum {
                delta,
                required: self.momentum_threshold,
            });
        }
        Signal::enter(Direction::Long)
    }

    fn evaluate_short(&self, r: &RsiReadings) -> Signal {
        if r.previous <= self.overbought {
            return Signal::vetoed(VetoReason::SingleBarTouch);
        }
        if r.current >= self.extreme_ceiling() {
            return Signal::vetoed(VetoReason::RisingKnife);
        }
        let delta = r.previous - r.current;
        if delta <= self.momentum_threshold {
            return Signal::vetoed(VetoReason::InsufficientMomentum {
                delta,
                required: self.momentum_threshold,
            });
        }
        Signal::enter(Direction::Short)
    }
}

impl SignalGenerator for MomentumRsiSignal {
    fn name(&self) -> &str {
        "rsi_momentum"
    }

    fn evaluate(&self, readings: &RsiReadings) -> Signal {
        if readings.current < self.oversold {
            self.evaluate_long(readings)
        } else if readings.current > self.overbought {
            self.evaluate_short(readings)
        } else if readings.previous < self.oversold {
            Signal::vetoed(VetoReason::NotOversold)
        } else if readings.previous > self.overbought {
            Signal::vetoed(VetoReason::NotOverbought)
        } else {
            Signal::none()
        }
    }
}

//! Basic RSI threshold signal.
//!
//! Long when RSI < oversold, short when RSI > overbought. Only the current
//! reading is used.

use super::{RsiReadings, Signal, SignalGenerator};
use crate::domain::Direction;

#[derive(Debug, Clone)]
pub struct BasicRsiSignal {
    pub oversold: f64,
    pub overbought: f64,
}

impl BasicRsiSignal {
    pub fn new(oversold: f64, overbought: f64) -> Self {
        Self {
            oversold,
            overbought,
        }
    }
}

impl SignalGenerator for BasicRsiSignal {
    fn name(&self) -> &str {
        "rsi_basic"
    }

    fn evaluate(&self, readings: &RsiReadings) -> Signal {
        if readings.current < self.oversold {
            Signal::enter(Direction::Long)
        } else if readings.current > self.overbought {
            Signal::enter(Direction::Short)
        } else {
            Signal::none()
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar timeframe requested from the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn minutes(self) -> i64 {
        match self {
            Self::M1 => 1,
            Self::M5 => 5,
            Self::M15 => 15,
            Self::M30 => 30,
            Self::H1 => 60,
            Self::H4 => 240,
            Self::D1 => 1440,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::M1 => "M1",
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H4 => "H4",
            Self::D1 => "D1",
        };
        f.write_str(s)
    }
}

/// Instrument contract metadata used for sizing.
///
/// A stop distance in price units is converted to points (`distance / point_size`);
/// `value_per_point` is the account-currency value of one point for one volume unit
/// (e.g. $10 per pip per standard lot on EURUSD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub point_size: f64,
    pub value_per_point: f64,
    pub min_volume: f64,
    pub volume_step: f64,
    pub max_volume: f64,
}

impl InstrumentSpec {
    /// Standard forex major quoted to 4 decimals: pip = 0.0001, $10/pip/lot.
    pub fn forex_major(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            point_size: 0.0001,
            value_per_point: 10.0,
            min_volume: 0.01,
            volume_step: 0.01,
            max_volume: 100.0,
        }
    }

    /// Convert a price distance to points.
    pub fn to_points(&self, price_distance: f64) -> f64 {
        price_distance / self.point_size
    }

    /// Floor a volume onto the step grid.
    ///
    /// A small tolerance absorbs representation error (0.5 / 0.01 = 49.999…).
    pub fn floor_volume(&self, volume: f64) -> f64 {
        if self.volume_step <= 0.0 {
            return volume;
        }
        let steps = (volume / self.volume_step + 1e-9).floor();
        steps * self.volume_step
    }

    /// Account-currency value of a price move of `price_distance` for `volume` units.
    pub fn money_at_risk(&self, price_distance: f64, volume: f64) -> f64 {
        self.to_points(price_distance) * self.value_per_point * volume
    }

    pub fn is_valid(&self) -> bool {
        self.point_size > 0.0
            && self.value_per_point > 0.0
            && self.min_volume > 0.0
            && self.volume_step > 0.0
            && self.max_volume >= self.min_volume
    }
}

//! Trailing stop variants and their ATR multiples.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ATR multiples that parameterize one trailing stop engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingMultiples {
    /// Profit (in ATR) that moves the stop to breakeven.
    pub breakeven_trigger: f64,
    /// Distance (in ATR) the stop trails behind the running extreme.
    pub trail_distance: f64,
    /// Initial stop distance (in ATR) from entry.
    pub hard_stop_distance: f64,
}

impl TrailingMultiples {
    pub fn new(breakeven_trigger: f64, trail_distance: f64, hard_stop_distance: f64) -> Self {
        Self {
            breakeven_trigger,
            trail_distance,
            hard_stop_distance,
        }
    }

    pub fn is_valid(&self) -> bool {
        [
            self.breakeven_trigger,
            self.trail_distance,
            self.hard_stop_distance,
        ]
        .iter()
        .all(|m| m.is_finite() && *m > 0.0)
    }
}

/// Closed set of stop-management presets. They differ only in their multiples.
///
/// Serialized by name; the single-letter aliases `A`..`D` are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingVariant {
    /// 1.5 / 1.0 / 2.0
    #[serde(alias = "A")]
    TightConservative,
    /// 2.0 / 1.5 / 2.5
    #[serde(alias = "B")]
    PatientWide,
    /// 0.5 / 0.25 / 0.5
    #[serde(alias = "C")]
    TightAggressive,
    /// 1.0 / 1.5 / 2.0
    #[default]
    #[serde(alias = "D")]
    CustomBalanced,
}

impl TrailingVariant {
    pub const ALL: [TrailingVariant; 4] = [
        Self::TightConservative,
        Self::PatientWide,
        Self::TightAggressive,
        Self::CustomBalanced,
    ];

    pub fn multiples(self) -> TrailingMultiples {
        match self {
            Self::TightConservative => TrailingMultiples::new(1.5, 1.0, 2.0),
            Self::PatientWide => TrailingMultiples::new(2.0, 1.5, 2.5),
            Self::TightAggressive => TrailingMultiples::new(0.5, 0.25, 0.5),
            Self::CustomBalanced => TrailingMultiples::new(1.0, 1.5, 2.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TightConservative => "tight_conservative",
            Self::PatientWide => "patient_wide",
            Self::TightAggressive => "tight_aggressive",
            Self::CustomBalanced => "custom_balanced",
        }
    }
}

impl fmt::Display for TrailingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_have_expected_multiples() {
        assert_eq!(
            TrailingVariant::TightConservative.multiples(),
            TrailingMultiples::new(1.5, 1.0, 2.0)
        );
        assert_eq!(
            TrailingVariant::PatientWide.multiples(),
            TrailingMultiples::new(2.0, 1.5, 2.5)
        );
        assert_eq!(
            TrailingVariant::TightAggressive.multiples(),
            TrailingMultiples::new(0.5, 0.25, 0.5)
        );
        assert_eq!(
            TrailingVariant::CustomBalanced.multiples(),
            TrailingMultiples::new(1.0, 1.5, 2.0)
        );
    }

    #[test]
    fn all_presets_valid() {
        for v in TrailingVariant::ALL {
            assert!(v.multiples().is_valid(), "{v} invalid");
        }
    }

    #[test]
    fn variant_accepts_letter_alias() {
        let v: TrailingVariant = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(v, TrailingVariant::PatientWide);
        let v: TrailingVariant = serde_json::from_str("\"tight_aggressive\"").unwrap();
        assert_eq!(v, TrailingVariant::TightAggressive);
        assert_eq!(
            serde_json::to_string(&TrailingVariant::CustomBalanced).unwrap(),
            "\"custom_balanced\""
        );
    }

    #[test]
    fn invalid_multiples_detected() {
        assert!(!TrailingMultiples::new(1.0, 0.0, 2.0).is_valid());
        assert!(!TrailingMultiples::new(f64::NAN, 1.0, 2.0).is_valid());
    }
}

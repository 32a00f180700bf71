//! Signal filter: gates entry signals based on market conditions.
//!
//! Filters see the candidate direction and the indicator snapshot, never
//! position or account state.

pub mod trend;

pub use trend::{TrendDirection, TrendFilter, TrendFilterMode, TrendState, TrendStrength};

use super::signal::VetoReason;
use crate::domain::Direction;
use crate::indicators::IndicatorSnapshot;

/// Outcome of a filter evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterVerdict {
    Passed,
    Vetoed(VetoReason),
}

impl FilterVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Trait for signal filters.
pub trait SignalFilter: Send + Sync {
    /// Human-readable name (e.g., "trend_filter").
    fn name(&self) -> &str;

    /// Decide whether an entry in `direction` may proceed.
    fn evaluate(&self, direction: Direction, snapshot: &IndicatorSnapshot) -> FilterVerdict;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_verdict_is_passed() {
        assert!(FilterVerdict::Passed.is_passed());
        assert!(!FilterVerdict::Vetoed(VetoReason::TrendMisaligned).is_passed());
    }
}

//! MeanRev Core: decision engine for an RSI mean-reversion strategy.
//!
//! This crate contains everything between a closed bar and a venue request:
//! - Domain types (bars, instruments, positions, identifiers)
//! - Indicators (RSI, ATR, EMA) with Wilder smoothing
//! - Entry signals (basic and momentum-filtered) and the trend filter
//! - Risk evaluation (position sizing, per-trade and portfolio caps)
//! - Multi-stage trailing stop engine (hard stop → breakeven → trailing)
//! - Per-instance orchestration with hot-reloadable parameters
//!
//! Broker connectivity is out of scope: the orchestrator talks to the
//! [`venue::Venue`] and [`venue::PositionRegistry`] traits.

pub mod components;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod indicators;
pub mod risk;
pub mod trailing;
pub mod venue;

pub use config::{InstanceConfig, ParameterStore, StrategyParameters};
pub use engine::{ClosedPosition, StrategyInstance};
pub use error::EngineError;
pub use events::EngineEvent;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared types are Send + Sync.
    ///
    /// Instances run on their own threads and share the parameter store and
    /// the position registry. If any type fails this check, the build breaks.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::PriceBar>();
        require_sync::<domain::PriceBar>();
        require_send::<domain::BarHistory>();
        require_sync::<domain::BarHistory>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::InstrumentSpec>();
        require_sync::<domain::InstrumentSpec>();
        require_send::<domain::ParamsFingerprint>();
        require_sync::<domain::ParamsFingerprint>();

        // Components
        require_send::<components::IndicatorValues>();
        require_sync::<components::IndicatorValues>();
        require_send::<components::signal::BasicRsiSignal>();
        require_sync::<components::signal::BasicRsiSignal>();
        require_send::<components::signal::MomentumRsiSignal>();
        require_sync::<components::signal::MomentumRsiSignal>();
        require_send::<components::TrendFilter>();
        require_sync::<components::TrendFilter>();

        // Risk and trailing
        require_send::<risk::RiskEvaluator>();
        require_sync::<risk::RiskEvaluator>();
        require_send::<trailing::TrailingStopEngine>();
        require_sync::<trailing::TrailingStopEngine>();

        // Orchestration
        require_send::<config::ParameterStore>();
        require_sync::<config::ParameterStore>();
        require_send::<engine::StrategyInstance>();
        require_send::<events::EngineEvent>();
        require_sync::<events::EngineEvent>();
    }

    /// Architecture contract: signal generators see RSI readings only.
    ///
    /// `evaluate()` takes `&RsiReadings`, with no account or position state.
    /// If someone widens the signature, every implementation breaks.
    #[test]
    fn signal_generator_sees_only_readings() {
        fn _check_trait_object_builds(
            sig: &dyn components::SignalGenerator,
            readings: &components::RsiReadings,
        ) -> components::Signal {
            sig.evaluate(readings)
        }
    }

    /// Architecture contract: filters see the direction and indicator snapshot only.
    #[test]
    fn signal_filter_sees_only_snapshot() {
        fn _check_trait_object_builds(
            filter: &dyn components::SignalFilter,
            direction: domain::Direction,
            snapshot: &indicators::IndicatorSnapshot,
        ) -> components::FilterVerdict {
            filter.evaluate(direction, snapshot)
        }
    }
}

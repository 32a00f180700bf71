//! Strategy components.
//!
//! - Indicator trait and the keyed series table
//! - Signal generators: RSI readings in, entry intent out; the RSI exit rule
//! - Signal filters: gate entry intent on market regime

pub mod filter;
pub mod indicator;
pub mod signal;

pub use filter::{FilterVerdict, SignalFilter, TrendFilter, TrendFilterMode, TrendState};
pub use indicator::{Indicator, IndicatorValues, SeriesKey};
pub use signal::{
    evaluate_entry, generator_for, RsiExit, RsiReadings, Signal, SignalGenerator, SignalKind, VetoReason,
};

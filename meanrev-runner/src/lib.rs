//! MeanRev Runner: deterministic replay harness for the decision engine.
//!
//! This crate builds on `meanrev-core` to provide:
//! - A simulated venue (fills at close, venue-side stops, injected failures)
//! - An in-memory position registry shared across instances
//! - Seeded synthetic bar feeds
//! - Single- and multi-instrument replays with trade records
//! - JSON / CSV / JSONL export

pub mod config;
pub mod export;
pub mod registry;
pub mod replay;
pub mod synthetic;
pub mod venue;

pub use config::{ReplayConfig, ReplayError};
pub use export::{export_events_jsonl, export_json, export_trades_csv, save_artifacts};
pub use registry::SharedRegistry;
pub use replay::{run_portfolio_replay, run_replay, PortfolioReport, ReplayReport, TradeRecord};
pub use synthetic::{synthetic_bars, synthetic_bars_with};
pub use venue::{SimulatedVenue, VenueClose};

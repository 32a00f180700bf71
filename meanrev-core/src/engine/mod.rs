//! Position orchestration: the per-bar decision loop of one strategy instance.
//!
//! Per bar:
//! 1. Pick up the latest parameter snapshot (hot reload happens only here)
//! 2. Append the bar to the history (invalid bars are skipped)
//! 3. Recompute indicators over the history
//! 4. Flat: signal → risk → entry order → open position with its trailing engine
//! 5. In a position: trailing engine update → venue stop sync

pub mod instance;
pub mod retry;

pub use instance::{ClosedPosition, StrategyInstance};
pub use retry::{RetryExhausted, RetryPolicy};

//! Domain types for the mean-reversion engine

pub mod bar;
pub mod ids;
pub mod instrument;
pub mod position;

pub use bar::{BarError, BarHistory, PriceBar};
pub use ids::{OwnerTag, ParamsFingerprint, PositionId};
pub use instrument::{InstrumentSpec, Timeframe};
pub use position::{Direction, Fill, Position, StopStage};

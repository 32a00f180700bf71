//! Risk evaluation: position sizing under layered exposure limits.
//!
//! Decisions are values. A rejection is a normal outcome carrying a reason,
//! not an error. The decision is advisory: placing the order is the caller's job.

pub mod evaluator;
pub mod limits;
pub mod sizing;

pub use evaluator::{RiskEvaluator, RiskRequest};
pub use limits::RiskLimits;
pub use sizing::{risk_reward_ratio, stop_price_for, validate_stop};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::venue::RegisteredPosition;

/// Why a trade was not sized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Even the minimum volume would risk more than the per-position cap.
    PerTradeCap {
        risk_percent_at_min: f64,
        cap: f64,
    },
    /// The addition would push the owner's committed risk over the ceiling.
    PortfolioCap {
        current: f64,
        requested: f64,
        limit: f64,
    },
    /// The volume cap is below the instrument's minimum volume.
    BelowMinSize { max_volume: f64, min_volume: f64 },
    /// The (possibly widened) stop exceeds the allowed distance.
    StopTooWide { distance: f64, max: f64 },
    InvalidInput { detail: String },
}

impl RejectionReason {
    /// Stable snake_case code used in events and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PerTradeCap { .. } => "per_trade_cap",
            Self::PortfolioCap { .. } => "portfolio_cap",
            Self::BelowMinSize { .. } => "below_min_size",
            Self::StopTooWide { .. } => "stop_too_wide",
            Self::InvalidInput { .. } => "invalid_input",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerTradeCap {
                risk_percent_at_min,
                cap,
            } => write!(
                f,
                "per_trade_cap: minimum volume risks {risk_percent_at_min:.2}% > cap {cap:.2}%"
            ),
            Self::PortfolioCap {
                current,
                requested,
                limit,
            } => write!(
                f,
                "portfolio_cap: {current:.2}% open + {requested:.2}% requested > limit {limit:.2}%"
            ),
            Self::BelowMinSize {
                max_volume,
                min_volume,
            } => write!(
                f,
                "below_min_size: volume cap {max_volume} < minimum {min_volume}"
            ),
            Self::StopTooWide { distance, max } => {
                write!(f, "stop_too_wide: {distance:.5} > {max:.5}")
            }
            Self::InvalidInput { detail } => write!(f, "invalid_input: {detail}"),
        }
    }
}

/// Immutable result of one risk evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub approved: bool,
    /// Approved volume (0 when rejected).
    pub volume: f64,
    pub rejection: Option<RejectionReason>,
    /// Stop distance after widening to the venue minimum.
    pub stop_distance: f64,
    pub stop_widened: bool,
    /// Risk percent this trade adds to the portfolio total.
    pub committed_risk_percent: f64,
}

impl RiskDecision {
    pub fn approve(
        volume: f64,
        stop_distance: f64,
        stop_widened: bool,
        committed_risk_percent: f64,
    ) -> Self {
        Self {
            approved: true,
            volume,
            rejection: None,
            stop_distance,
            stop_widened,
            committed_risk_percent,
        }
    }

    pub fn reject(reason: RejectionReason, stop_distance: f64) -> Self {
        Self {
            approved: false,
            volume: 0.0,
            rejection: Some(reason),
            stop_distance,
            stop_widened: false,
            committed_risk_percent: 0.0,
        }
    }
}

/// Sum of committed risk percent across open positions.
pub fn portfolio_risk(positions: &[RegisteredPosition]) -> f64 {
    positions.iter().map(|p| p.risk_percent).sum()
}

//! Engine events.
//!
//! Every decision the orchestrator makes, including every failure, becomes an
//! `EngineEvent` with a stable dotted name. Events are returned to the caller
//! and also logged through `tracing`; the core never installs a subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::VetoReason;
use crate::domain::{Direction, ParamsFingerprint, PositionId, StopStage};
use crate::risk::RejectionReason;
use crate::trailing::{StopChange, StopReason, TrailingVariant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EngineEvent {
    #[serde(rename = "bar.skipped")]
    BarSkipped {
        timestamp: DateTime<Utc>,
        reason: String,
    },
    #[serde(rename = "signal.generated")]
    SignalGenerated {
        timestamp: DateTime<Utc>,
        direction: Direction,
        rsi: f64,
        rsi_prev: f64,
    },
    #[serde(rename = "signal.vetoed")]
    SignalVetoed {
        timestamp: DateTime<Utc>,
        reason: VetoReason,
    },
    #[serde(rename = "risk.rejected")]
    RiskRejected {
        timestamp: DateTime<Utc>,
        direction: Direction,
        reason: RejectionReason,
    },
    #[serde(rename = "order.failed")]
    OrderFailed {
        timestamp: DateTime<Utc>,
        direction: Direction,
        volume: f64,
        reason: String,
    },
    #[serde(rename = "position.opened")]
    PositionOpened {
        timestamp: DateTime<Utc>,
        position_id: PositionId,
        direction: Direction,
        entry_price: f64,
        volume: f64,
        stop_price: f64,
        variant: TrailingVariant,
        risk_percent: f64,
    },
    #[serde(rename = "stop.updated")]
    StopUpdated {
        timestamp: DateTime<Utc>,
        position_id: PositionId,
        stage: StopStage,
        price: f64,
        previous: f64,
        reason: StopReason,
    },
    #[serde(rename = "stop.sync_failed")]
    StopSyncFailed {
        timestamp: DateTime<Utc>,
        position_id: PositionId,
        stop: f64,
        attempts: u32,
        reason: String,
    },
    #[serde(rename = "indicator.stale")]
    IndicatorStale {
        timestamp: DateTime<Utc>,
        indicator: String,
        held_stop: f64,
    },
    #[serde(rename = "exit.signaled")]
    ExitSignaled {
        timestamp: DateTime<Utc>,
        position_id: PositionId,
        direction: Direction,
        rsi: f64,
        exit_level: f64,
    },
    #[serde(rename = "exit.failed")]
    ExitFailed {
        timestamp: DateTime<Utc>,
        position_id: PositionId,
        reason: String,
    },
    #[serde(rename = "position.closed")]
    PositionClosed {
        timestamp: DateTime<Utc>,
        position_id: PositionId,
        stage: StopStage,
        exit_price: f64,
        duration_bars: u64,
        duration_secs: i64,
        stop_history: Vec<StopChange>,
    },
    #[serde(rename = "config.applied")]
    ConfigApplied {
        version: u64,
        fingerprint: ParamsFingerprint,
    },
    #[serde(rename = "config.rejected")]
    ConfigRejected { reason: String },
}

impl EngineEvent {
    /// Stable dotted event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BarSkipped { .. } => "bar.skipped",
            Self::SignalGenerated { .. } => "signal.generated",
            Self::SignalVetoed { .. } => "signal.vetoed",
            Self::RiskRejected { .. } => "risk.rejected",
            Self::OrderFailed { .. } => "order.failed",
            Self::PositionOpened { .. } => "position.opened",
            Self::StopUpdated { .. } => "stop.updated",
            Self::StopSyncFailed { .. } => "stop.sync_failed",
            Self::IndicatorStale { .. } => "indicator.stale",
            Self::ExitSignaled { .. } => "exit.signaled",
            Self::ExitFailed { .. } => "exit.failed",
            Self::PositionClosed { .. } => "position.closed",
            Self::ConfigApplied { .. } => "config.applied",
            Self::ConfigRejected { .. } => "config.rejected",
        }
    }
}

/// Log an event with structured fields at a level matching its severity.
pub fn trace_event(instance: &str, event: &EngineEvent) {
    let name = event.name();
    match event {
        EngineEvent::BarSkipped { timestamp, reason } => {
            tracing::warn!(instance, event = name, %timestamp, %reason, "bar skipped");
        }
        EngineEvent::SignalGenerated {
            direction,
            rsi,
            rsi_prev,
            ..
        } => {
            tracing::info!(instance, event = name, %direction, rsi, rsi_prev, "entry signal");
        }
        EngineEvent::SignalVetoed { reason, .. } => {
            tracing::warn!(instance, event = name, reason = %reason, "signal vetoed");
        }
        EngineEvent::RiskRejected {
            direction, reason, ..
        } => {
            tracing::warn!(instance, event = name, %direction, reason = %reason, "risk rejected");
        }
        EngineEvent::OrderFailed {
            direction,
            volume,
            reason,
            ..
        } => {
            tracing::error!(instance, event = name, %direction, volume, %reason, "entry order failed");
        }
        EngineEvent::PositionOpened {
            position_id,
            direction,
            entry_price,
            volume,
            stop_price,
            variant,
            risk_percent,
            ..
        } => {
            tracing::info!(
                instance,
                event = name,
                position = %position_id,
                %direction,
                entry_price,
                volume,
                stop_price,
                %variant,
                risk_percent,
                "position opened"
            );
        }
        EngineEvent::StopUpdated {
            position_id,
            stage,
            price,
            previous,
            reason,
            ..
        } => {
            tracing::info!(
                instance,
                event = name,
                position = %position_id,
                %stage,
                price,
                previous,
                %reason,
                "stop updated"
            );
        }
        EngineEvent::StopSyncFailed {
            position_id,
            stop,
            attempts,
            reason,
            ..
        } => {
            tracing::error!(
                instance,
                event = name,
                position = %position_id,
                stop,
                attempts,
                %reason,
                "stop modification failed"
            );
        }
        EngineEvent::IndicatorStale {
            indicator,
            held_stop,
            ..
        } => {
            tracing::warn!(instance, event = name, %indicator, held_stop, "indicator undefined, holding stop");
        }
        EngineEvent::ExitSignaled {
            position_id,
            direction,
            rsi,
            exit_level,
            ..
        } => {
            tracing::info!(
                instance,
                event = name,
                position = %position_id,
                %direction,
                rsi,
                exit_level,
                "exit signal"
            );
        }
        EngineEvent::ExitFailed {
            position_id, reason, ..
        } => {
            tracing::error!(instance, event = name, position = %position_id, %reason, "close request failed");
        }
        EngineEvent::PositionClosed {
            position_id,
            stage,
            exit_price,
            duration_bars,
            duration_secs,
            stop_history,
            ..
        } => {
            tracing::info!(
                instance,
                event = name,
                position = %position_id,
                %stage,
                exit_price,
                duration_bars,
                duration_secs,
                adjustments = stop_history.len(),
                "position closed"
            );
        }
        EngineEvent::ConfigApplied {
            version,
            fingerprint,
        } => {
            tracing::info!(instance, event = name, version, fingerprint = fingerprint.short(), "parameters applied");
        }
        EngineEvent::ConfigRejected { reason } => {
            tracing::warn!(instance, event = name, %reason, "parameters rejected");
        }
    }
}

//! Strategy instance: owns the bar history and the single open position of
//! one (instrument, timeframe, owner) combination.
//!
//! The instance is driven synchronously: the caller feeds closed bars and
//! closure confirmations, and receives the resulting events. Parameters are
//! read from a shared `ParameterStore` once at the start of each bar.
//!
//! An RSI exit asks the venue to close the position. The position stays held,
//! with stop management suspended, until the closure is confirmed through
//! `on_position_closed` like any other exit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::retry::RetryPolicy;
use crate::components::{
    evaluate_entry, generator_for, Indicator, RsiExit, RsiReadings, SignalFilter, TrendFilter,
    VetoReason,
};
use crate::config::{InstanceConfig, ParameterStore, StrategyParameters};
use crate::domain::{BarHistory, Position, PositionId, PriceBar};
use crate::error::{ConfigError, DataError, EngineError, ExecutionError};
use crate::events::{trace_event, EngineEvent};
use crate::indicators::{IndicatorSet, IndicatorSnapshot};
use crate::risk::{RiskEvaluator, RiskRequest};
use crate::trailing::{StopStatistics, TrailingStopEngine};
use crate::venue::{EntryOrder, PositionRegistry, RegisteredPosition, Venue};

/// Position plus the engine it was opened with.
#[derive(Debug, Clone)]
struct OpenPosition {
    position: Position,
    engine: TrailingStopEngine,
    opened_at_bar: u64,
    /// Last stop the venue confirmed.
    venue_stop: f64,
    /// Close sent on an exit signal; waiting for the closure confirmation.
    exit_requested: bool,
}

/// Summary returned when the venue confirms a closure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub position: Position,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub duration_bars: u64,
    pub statistics: StopStatistics,
}

impl ClosedPosition {
    pub fn duration(&self) -> chrono::Duration {
        self.exit_time - self.position.entry_time
    }

    /// Favourable price distance from entry to exit (negative for a loss).
    pub fn realized_distance(&self) -> f64 {
        self.position
            .direction
            .favourable(self.position.entry_price, self.exit_price)
    }

    pub fn event(&self) -> EngineEvent {
        EngineEvent::PositionClosed {
            timestamp: self.exit_time,
            position_id: self.position.id.clone(),
            stage: self.position.stage,
            exit_price: self.exit_price,
            duration_bars: self.duration_bars,
            duration_secs: self.duration().num_seconds(),
            stop_history: self.position.stop_history.clone(),
        }
    }
}

pub struct StrategyInstance {
    label: String,
    config: InstanceConfig,
    store: Arc<ParameterStore>,
    applied_version: u64,
    history: BarHistory,
    open: Option<OpenPosition>,
    bars_seen: u64,
    /// Events raised between bars, delivered with the next bar.
    pending: Vec<EngineEvent>,
}

impl StrategyInstance {
    pub fn new(config: InstanceConfig, store: Arc<ParameterStore>) -> Self {
        let label = format!(
            "{}:{}:{}",
            config.instrument.symbol, config.timeframe, config.owner
        );
        Self {
            label,
            history: BarHistory::new(config.history_capacity),
            config,
            store,
            applied_version: 0,
            open: None,
            bars_seen: 0,
            pending: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn position(&self) -> Option<&Position> {
        self.open.as_ref().map(|o| &o.position)
    }

    /// Trailing engine of the open position.
    pub fn trailing_engine(&self) -> Option<&TrailingStopEngine> {
        self.open.as_ref().map(|o| &o.engine)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Parameter version the last bar was evaluated under (0 before the first bar).
    pub fn applied_version(&self) -> u64 {
        self.applied_version
    }

    /// Seed the history from the venue. Returns how many bars were kept.
    pub fn warm_up(&mut self, venue: &mut dyn Venue) -> Result<usize, EngineError> {
        let symbol = &self.config.instrument.symbol;
        let bars = venue.bars(symbol, self.config.timeframe, self.config.warmup_bars)?;
        if bars.is_empty() {
            return Err(DataError::EmptyHistory {
                instrument: symbol.clone(),
            }
            .into());
        }
        let offered = bars.len();
        let kept = self.history.seed(bars);

        let (_, params) = self.store.snapshot();
        let indicators = IndicatorSet::from_params(&params);
        let needed = indicators.warmup_bars();
        let ready = indicators.snapshot(self.history.as_slice()).is_tradeable();
        tracing::info!(instance = %self.label, offered, kept, needed, ready, "history warmed up");
        if !ready {
            tracing::warn!(
                instance = %self.label,
                kept,
                needed,
                "history too short for the indicators; entries wait for more bars"
            );
        }
        Ok(kept)
    }

    /// Publish new parameters. They take effect at the start of the next bar;
    /// an open position keeps the trailing engine it was opened with.
    pub fn on_config_changed(&mut self, params: StrategyParameters) -> Result<u64, ConfigError> {
        let expected = self.store.version();
        self.store.compare_and_swap(expected, params).map_err(|e| {
            let event = EngineEvent::ConfigRejected {
                reason: e.to_string(),
            };
            emit(&self.label, &mut self.pending, event);
            e
        })
    }

    /// Evaluate one closed bar.
    pub fn on_new_bar(
        &mut self,
        bar: PriceBar,
        venue: &mut dyn Venue,
        registry: &dyn PositionRegistry,
    ) -> Vec<EngineEvent> {
        let mut events = std::mem::take(&mut self.pending);

        let (version, params) = self.store.snapshot();
        if version != self.applied_version {
            self.applied_version = version;
            let event = EngineEvent::ConfigApplied {
                version,
                fingerprint: params.fingerprint(),
            };
            emit(&self.label, &mut events, event);
        }

        let timestamp = bar.timestamp;
        let close = bar.close;
        if let Err(e) = self.history.push(bar) {
            let event = EngineEvent::BarSkipped {
                timestamp,
                reason: DataError::from(e).to_string(),
            };
            emit(&self.label, &mut events, event);
            return events;
        }
        self.bars_seen += 1;

        let indicators = IndicatorSet::from_params(&params);
        let snapshot = indicators.snapshot(self.history.as_slice());
        tracing::debug!(
            instance = %self.label,
            rsi_label = %indicators.rsi.label(),
            rsi = ?snapshot.rsi,
            rsi_prev = ?snapshot.rsi_prev,
            atr = ?snapshot.atr,
            close,
            "indicators"
        );

        if self.open.is_some() {
            self.manage_position(timestamp, close, &params, &snapshot, venue, &mut events);
        } else {
            self.seek_entry(timestamp, close, &params, &snapshot, venue, registry, &mut events);
        }
        events
    }

    /// Venue confirmed the position is closed (stop hit or external close).
    pub fn on_position_closed(
        &mut self,
        id: &PositionId,
        exit_price: f64,
        exit_time: DateTime<Utc>,
    ) -> Result<ClosedPosition, EngineError> {
        match self.open.take() {
            Some(open) if &open.position.id == id => {
                let closed = ClosedPosition {
                    statistics: StopStatistics::of(&open.position),
                    position: open.position,
                    exit_price,
                    exit_time,
                    duration_bars: self.bars_seen.saturating_sub(open.opened_at_bar),
                };
                trace_event(&self.label, &closed.event());
                Ok(closed)
            }
            other => {
                self.open = other;
                Err(EngineError::NoSuchPosition(id.clone()))
            }
        }
    }

    fn manage_position(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        params: &StrategyParameters,
        snapshot: &IndicatorSnapshot,
        venue: &mut dyn Venue,
        events: &mut Vec<EngineEvent>,
    ) {
        let label = &self.label;
        let retry = self.config.stop_retry;
        let Some(open) = self.open.as_mut() else {
            return;
        };
        if open.exit_requested {
            return;
        }

        let direction = open.position.direction;
        let exit = RsiExit::from_params(params)
            .zip(snapshot.rsi)
            .filter(|(rule, rsi)| rule.should_exit(direction, *rsi));
        if let Some((rule, rsi)) = exit {
            let id = open.position.id.clone();
            let event = EngineEvent::ExitSignaled {
                timestamp,
                position_id: id.clone(),
                direction,
                rsi,
                exit_level: rule.level(),
            };
            emit(label, events, event);
            match venue.close_position(&id) {
                Ok(fill) => {
                    open.exit_requested = true;
                    tracing::info!(instance = %label, position = %id, exit_price = fill.price, "close filled");
                    return;
                }
                Err(e) => {
                    let event = EngineEvent::ExitFailed {
                        timestamp,
                        position_id: id,
                        reason: e.to_string(),
                    };
                    emit(label, events, event);
                }
            }
        }

        match open.engine.update(&mut open.position, price, snapshot.atr) {
            Ok(Some(update)) => {
                let event = EngineEvent::StopUpdated {
                    timestamp,
                    position_id: open.position.id.clone(),
                    stage: update.stage,
                    price: update.stop,
                    previous: update.previous,
                    reason: update.reason,
                };
                emit(label, events, event);
            }
            Ok(None) => {}
            Err(stale) => {
                let event = EngineEvent::IndicatorStale {
                    timestamp,
                    indicator: stale.indicator,
                    held_stop: stale.held_stop,
                };
                emit(label, events, event);
            }
        }

        // Also retries a stop that failed to sync on an earlier bar.
        sync_stop(label, retry, open, venue, timestamp, events);
    }

    #[allow(clippy::too_many_arguments)]
    fn seek_entry(
        &mut self,
        timestamp: DateTime<Utc>,
        close: f64,
        params: &StrategyParameters,
        snapshot: &IndicatorSnapshot,
        venue: &mut dyn Venue,
        registry: &dyn PositionRegistry,
        events: &mut Vec<EngineEvent>,
    ) {
        let generator = generator_for(params);
        let filter = params
            .trend
            .enabled
            .then(|| TrendFilter::new(params.trend.strength_threshold, params.trend.mode));
        let signal = evaluate_entry(
            generator.as_ref(),
            filter.as_ref().map(|f| f as &dyn SignalFilter),
            snapshot,
            false,
        );

        let Some(direction) = signal.kind.direction() else {
            if let Some(reason) = signal.veto {
                emit(&self.label, events, EngineEvent::SignalVetoed { timestamp, reason });
            }
            return;
        };
        let (Some(readings), Some(atr)) = (RsiReadings::from_snapshot(snapshot), snapshot.atr) else {
            let reason = VetoReason::IndicatorUndefined;
            emit(&self.label, events, EngineEvent::SignalVetoed { timestamp, reason });
            return;
        };
        let event = EngineEvent::SignalGenerated {
            timestamp,
            direction,
            rsi: readings.current,
            rsi_prev: readings.previous,
        };
        emit(&self.label, events, event);

        let (min_stop, balance, open_positions) = match self.pre_trade_state(venue, registry) {
            Ok(state) => state,
            Err(e) => {
                let event = EngineEvent::OrderFailed {
                    timestamp,
                    direction,
                    volume: 0.0,
                    reason: format!("pre-trade query failed: {e}"),
                };
                emit(&self.label, events, event);
                return;
            }
        };

        let engine = params.trailing_engine().with_min_distance(min_stop);
        let request = RiskRequest {
            balance,
            risk_percent: params.risk_percent,
            stop_distance: engine.multiples().hard_stop_distance * atr,
            min_stop_distance: min_stop,
            instrument: &self.config.instrument,
        };
        let decision = RiskEvaluator::new(params.risk.clone()).evaluate(&request, &open_positions);
        if let Some(reason) = decision.rejection {
            emit(&self.label, events, EngineEvent::RiskRejected { timestamp, direction, reason });
            return;
        }

        let order = EntryOrder {
            instrument: self.config.instrument.symbol.clone(),
            direction,
            volume: decision.volume,
            stop_price: engine.initial_stop(direction, close, atr, min_stop),
            owner: self.config.owner.clone(),
            risk_percent: decision.committed_risk_percent,
        };
        let fill = match venue.place_order(&order) {
            Ok(fill) => fill,
            Err(e) => {
                let event = EngineEvent::OrderFailed {
                    timestamp,
                    direction,
                    volume: order.volume,
                    reason: e.to_string(),
                };
                emit(&self.label, events, event);
                return;
            }
        };

        // The hard stop is anchored on the fill, not the reference close.
        let initial_stop = engine.initial_stop(direction, fill.price, atr, min_stop);
        let position = Position::open(
            fill,
            initial_stop,
            engine.variant(),
            decision.committed_risk_percent,
        );
        let event = EngineEvent::PositionOpened {
            timestamp,
            position_id: position.id.clone(),
            direction,
            entry_price: position.entry_price,
            volume: position.volume,
            stop_price: position.stop_price,
            variant: position.variant,
            risk_percent: position.committed_risk_percent,
        };
        emit(&self.label, events, event);

        let mut open = OpenPosition {
            position,
            engine,
            opened_at_bar: self.bars_seen,
            venue_stop: order.stop_price,
            exit_requested: false,
        };
        sync_stop(&self.label, self.config.stop_retry, &mut open, venue, timestamp, events);
        self.open = Some(open);
    }

    fn pre_trade_state(
        &self,
        venue: &mut dyn Venue,
        registry: &dyn PositionRegistry,
    ) -> Result<(f64, f64, Vec<RegisteredPosition>), ExecutionError> {
        let min_stop = venue.min_stop_distance(&self.config.instrument.symbol)?;
        let balance = venue.account_balance()?;
        let open = registry.open_positions(&self.config.owner)?;
        Ok((min_stop, balance, open))
    }
}

fn emit(label: &str, events: &mut Vec<EngineEvent>, event: EngineEvent) {
    trace_event(label, &event);
    events.push(event);
}

/// Push the engine's stop to the venue if they differ.
fn sync_stop(
    label: &str,
    policy: RetryPolicy,
    open: &mut OpenPosition,
    venue: &mut dyn Venue,
    timestamp: DateTime<Utc>,
    events: &mut Vec<EngineEvent>,
) {
    let target = open.position.stop_price;
    if open.venue_stop == target {
        return;
    }
    let id = open.position.id.clone();
    match policy.run(|| venue.modify_stop_loss(&id, target)) {
        Ok(()) => open.venue_stop = target,
        Err(failure) => {
            let event = EngineEvent::StopSyncFailed {
                timestamp,
                position_id: id,
                stop: target,
                attempts: failure.attempts,
                reason: failure.last_error.to_string(),
            };
            emit(label, events, event);
        }
    }
}

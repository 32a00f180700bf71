//! Replay runner: drives strategy instances over recorded or synthetic bars
//! against the simulated venue.
//!
//! Per bar and instrument:
//! 1. The venue applies the bar (stops crossed intrabar are filled)
//! 2. Each fill is confirmed to the instance as a closure
//! 3. The instance evaluates the closed bar (may enter or exit at the close)
//! 4. A close the instance requested is confirmed back to it
//!
//! Several instruments may share one venue, one account balance and one
//! position registry; feeds are stepped in lockstep by bar index.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use meanrev_core::config::ParameterStore;
use meanrev_core::domain::{Direction, ParamsFingerprint, Position, PriceBar, StopStage};
use meanrev_core::trailing::TrailingVariant;
use meanrev_core::{ClosedPosition, EngineEvent, StrategyInstance};

use crate::config::{ReplayConfig, ReplayError};
use crate::registry::SharedRegistry;
use crate::venue::{SimulatedVenue, VenueClose};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// One closed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub position_id: String,
    pub instrument: String,
    pub direction: Direction,
    pub variant: TrailingVariant,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub volume: f64,
    pub risk_percent: f64,
    pub initial_stop: f64,
    pub final_stop: f64,
    pub final_stage: StopStage,
    pub stop_adjustments: usize,
    pub breakeven_triggered: bool,
    pub bars_held: u64,
    /// Realised profit in account currency.
    pub pnl: f64,
}

impl TradeRecord {
    pub fn from_closed(closed: &ClosedPosition, pnl: f64) -> Self {
        let pos = &closed.position;
        Self {
            position_id: pos.id.to_string(),
            instrument: pos.instrument.clone(),
            direction: pos.direction,
            variant: pos.variant,
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_time: closed.exit_time,
            exit_price: closed.exit_price,
            volume: pos.volume,
            risk_percent: pos.committed_risk_percent,
            initial_stop: closed.statistics.initial_stop,
            final_stop: closed.statistics.final_stop,
            final_stage: closed.statistics.final_stage,
            stop_adjustments: closed.statistics.total_adjustments,
            breakeven_triggered: closed.statistics.breakeven_triggered,
            bars_held: closed.duration_bars,
            pnl,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Result of replaying one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub instrument: String,
    pub fingerprint: ParamsFingerprint,
    /// Bars evaluated after warm-up.
    pub bars: usize,
    pub trades: Vec<TradeRecord>,
    pub events: Vec<EngineEvent>,
    /// Still open when the feed ended (only without liquidation).
    pub open_position: Option<Position>,
    pub initial_balance: f64,
    /// Account balance at the end of the replay.
    pub final_balance: f64,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ReplayReport {
    pub fn net_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn win_rate(&self) -> Option<f64> {
        if self.trades.is_empty() {
            return None;
        }
        let wins = self.trades.iter().filter(|t| t.is_win()).count();
        Some(wins as f64 / self.trades.len() as f64)
    }

    pub fn event_count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name() == name).count()
    }
}

/// Result of a multi-instrument replay sharing one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub legs: Vec<ReplayReport>,
    pub initial_balance: f64,
    pub final_balance: f64,
}

impl PortfolioReport {
    pub fn trade_count(&self) -> usize {
        self.legs.iter().map(|l| l.trades.len()).sum()
    }
}

struct Leg {
    symbol: String,
    instance: StrategyInstance,
    feed: Vec<PriceBar>,
    report: ReplayReport,
}

impl Leg {
    fn step(&mut self, bar: &PriceBar, venue: &mut SimulatedVenue, registry: &SharedRegistry) {
        for out in venue.advance(&self.symbol, bar) {
            self.settle(out);
        }
        let events = self.instance.on_new_bar(bar.clone(), venue, registry);
        self.report.events.extend(events);
        for out in venue.take_requested_closes(&self.symbol) {
            self.settle(out);
        }
        self.report.bars += 1;
    }

    fn settle(&mut self, out: VenueClose) {
        match self.instance.on_position_closed(&out.id, out.exit_price, out.time) {
            Ok(closed) => {
                self.report.events.push(closed.event());
                self.report.trades.push(TradeRecord::from_closed(&closed, out.pnl));
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    position_id = %out.id,
                    instrument = %self.symbol,
                    "venue closed a position the instance does not hold"
                );
            }
        }
    }
}

/// Replay a single instrument.
pub fn run_replay(config: &ReplayConfig, bars: &[PriceBar]) -> Result<ReplayReport, ReplayError> {
    let portfolio = run_portfolio_replay(config.initial_balance, &[(config.clone(), bars)])?;
    portfolio
        .legs
        .into_iter()
        .next()
        .ok_or_else(|| ReplayError::Invalid("replay produced no report".into()))
}

/// Replay several instruments against one account and one registry.
///
/// Venue settings are merged: the widest minimum stop distance applies to
/// every instrument and injected modify failures are summed.
pub fn run_portfolio_replay(
    initial_balance: f64,
    legs: &[(ReplayConfig, &[PriceBar])],
) -> Result<PortfolioReport, ReplayError> {
    if legs.is_empty() {
        return Err(ReplayError::Invalid("no instruments to replay".into()));
    }
    for (i, (config, _)) in legs.iter().enumerate() {
        config.validate()?;
        let symbol = &config.instrument.symbol;
        if legs[..i].iter().any(|(c, _)| &c.instrument.symbol == symbol) {
            return Err(ReplayError::Invalid(format!("instrument {symbol} listed twice")));
        }
    }

    let registry = SharedRegistry::new();
    let min_stop = legs
        .iter()
        .map(|(c, _)| c.min_stop_distance)
        .fold(0.0, f64::max);
    let mut venue = SimulatedVenue::new(initial_balance, registry.clone()).with_min_stop_distance(min_stop);
    venue.inject_modify_failures(legs.iter().map(|(c, _)| c.injected_modify_failures).sum());

    let mut running = Vec::with_capacity(legs.len());
    for (config, bars) in legs {
        venue = venue.with_instrument(config.instrument.clone());
        let store = Arc::new(ParameterStore::new(config.strategy.clone())?);
        let mut instance = StrategyInstance::new(config.instance_config(), store);

        let split = config.warmup_bars.min(bars.len());
        let symbol = config.instrument.symbol.clone();
        if split > 0 {
            venue.load_history(&symbol, bars[..split].to_vec());
            instance.warm_up(&mut venue)?;
        }

        tracing::info!(
            instrument = %symbol,
            warmup = split,
            bars = bars.len() - split,
            fingerprint = %config.strategy.fingerprint().short(),
            "replay leg ready"
        );
        running.push(Leg {
            report: ReplayReport {
                schema_version: SCHEMA_VERSION,
                instrument: symbol.clone(),
                fingerprint: config.strategy.fingerprint(),
                bars: 0,
                trades: Vec::new(),
                events: Vec::new(),
                open_position: None,
                initial_balance,
                final_balance: initial_balance,
            },
            symbol,
            instance,
            feed: bars[split..].to_vec(),
        });
    }

    let longest = running.iter().map(|l| l.feed.len()).max().unwrap_or(0);
    for i in 0..longest {
        for leg in running.iter_mut() {
            if let Some(bar) = leg.feed.get(i).cloned() {
                leg.step(&bar, &mut venue, &registry);
            }
        }
    }

    if legs.iter().any(|(c, _)| c.liquidate_at_end) {
        for out in venue.liquidate() {
            if let Some(leg) = running.iter_mut().find(|l| l.symbol == out.instrument) {
                leg.settle(out);
            }
        }
    }

    let final_balance = venue.balance();
    let legs: Vec<ReplayReport> = running
        .into_iter()
        .map(|leg| ReplayReport {
            open_position: leg.instance.position().cloned(),
            final_balance,
            ..leg.report
        })
        .collect();

    tracing::info!(
        trades = legs.iter().map(|l| l.trades.len()).sum::<usize>(),
        initial_balance,
        final_balance,
        "replay finished"
    );
    Ok(PortfolioReport {
        legs,
        initial_balance,
        final_balance,
    })
}

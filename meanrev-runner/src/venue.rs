//! Simulated venue: fills at the last close, keeps venue-side stops and
//! closes positions when a bar crosses them or the strategy asks to exit.
//!
//! One venue may carry several instruments; the account balance is shared.
//! Every open position is mirrored into a [`SharedRegistry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use meanrev_core::domain::{Direction, Fill, InstrumentSpec, PositionId, PriceBar, Timeframe};
use meanrev_core::error::ExecutionError;
use meanrev_core::venue::{EntryOrder, RegisteredPosition, Venue};

use crate::registry::SharedRegistry;

/// Venue-side state of an open position.
#[derive(Debug, Clone, PartialEq)]
struct VenuePosition {
    instrument: String,
    direction: Direction,
    entry_price: f64,
    volume: f64,
    stop: f64,
}

/// A position the venue closed: stop filled, exit requested or liquidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueClose {
    pub id: PositionId,
    pub instrument: String,
    pub exit_price: f64,
    pub time: DateTime<Utc>,
    /// Realised profit in account currency.
    pub pnl: f64,
}

#[derive(Debug)]
pub struct SimulatedVenue {
    instruments: HashMap<String, InstrumentSpec>,
    /// Bars served by `Venue::bars` for warm-up.
    history: HashMap<String, Vec<PriceBar>>,
    quotes: HashMap<String, f64>,
    positions: HashMap<PositionId, VenuePosition>,
    registry: SharedRegistry,
    balance: f64,
    min_stop_distance: f64,
    /// Remaining `modify_stop_loss` calls that fail before the venue recovers.
    modify_failures: u32,
    /// Requested closes not yet confirmed to their instance.
    requested: Vec<VenueClose>,
    next_ticket: u64,
    last_time: DateTime<Utc>,
}

impl SimulatedVenue {
    pub fn new(balance: f64, registry: SharedRegistry) -> Self {
        Self {
            instruments: HashMap::new(),
            history: HashMap::new(),
            quotes: HashMap::new(),
            positions: HashMap::new(),
            registry,
            balance,
            min_stop_distance: 0.0,
            modify_failures: 0,
            requested: Vec::new(),
            next_ticket: 1_000,
            last_time: DateTime::<Utc>::default(),
        }
    }

    pub fn with_instrument(mut self, spec: InstrumentSpec) -> Self {
        self.instruments.insert(spec.symbol.clone(), spec);
        self
    }

    pub fn with_min_stop_distance(mut self, distance: f64) -> Self {
        self.min_stop_distance = distance;
        self
    }

    /// Make the next `count` stop modifications fail.
    pub fn inject_modify_failures(&mut self, count: u32) {
        self.modify_failures = count;
    }

    /// Preload bars served to `Venue::bars`.
    pub fn load_history(&mut self, symbol: &str, bars: Vec<PriceBar>) {
        if let Some(last) = bars.last() {
            self.quotes.insert(symbol.to_string(), last.close);
            self.last_time = self.last_time.max(last.timestamp);
        }
        self.history.insert(symbol.to_string(), bars);
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn stop_of(&self, id: &PositionId) -> Option<f64> {
        self.positions.get(id).map(|p| p.stop)
    }

    /// Apply a closed bar: stops crossed by it are filled, then the bar's
    /// close becomes the quote for new entries.
    ///
    /// A bar that gaps through a stop fills at its open.
    pub fn advance(&mut self, symbol: &str, bar: &PriceBar) -> Vec<VenueClose> {
        let mut hit: Vec<(PositionId, f64)> = self
            .positions
            .iter()
            .filter(|(_, p)| p.instrument == symbol)
            .filter_map(|(id, p)| stop_fill(p, bar).map(|price| (id.clone(), price)))
            .collect();
        hit.sort_by(|a, b| a.0 .0.cmp(&b.0 .0));

        let mut closed = Vec::with_capacity(hit.len());
        for (id, exit_price) in hit {
            let Some(pos) = self.positions.remove(&id) else {
                continue;
            };
            self.registry.remove(&id);
            let pnl = self.realised(&pos, exit_price);
            self.balance += pnl;
            tracing::info!(
                position_id = %id,
                instrument = %pos.instrument,
                exit_price,
                pnl,
                balance = self.balance,
                "venue stop filled"
            );
            closed.push(VenueClose {
                id,
                instrument: pos.instrument,
                exit_price,
                time: bar.timestamp,
                pnl,
            });
        }

        self.quotes.insert(symbol.to_string(), bar.close);
        self.last_time = self.last_time.max(bar.timestamp);
        closed
    }

    /// Closes requested through `Venue::close_position` on `symbol` since the
    /// last call.
    pub fn take_requested_closes(&mut self, symbol: &str) -> Vec<VenueClose> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.requested)
            .into_iter()
            .partition(|c| c.instrument == symbol);
        self.requested = kept;
        taken
    }

    /// Close everything at the current quote (end of a replay).
    pub fn liquidate(&mut self) -> Vec<VenueClose> {
        let mut ids: Vec<PositionId> = self.positions.keys().cloned().collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        let mut closed = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(pos) = self.positions.remove(&id) else {
                continue;
            };
            self.registry.remove(&id);
            let exit_price = self
                .quotes
                .get(&pos.instrument)
                .copied()
                .unwrap_or(pos.entry_price);
            let pnl = self.realised(&pos, exit_price);
            self.balance += pnl;
            closed.push(VenueClose {
                id,
                instrument: pos.instrument,
                exit_price,
                time: self.last_time,
                pnl,
            });
        }
        closed
    }

    fn realised(&self, pos: &VenuePosition, exit_price: f64) -> f64 {
        let distance = pos.direction.favourable(pos.entry_price, exit_price);
        match self.instruments.get(&pos.instrument) {
            Some(spec) => spec.money_at_risk(distance, pos.volume),
            None => distance * pos.volume,
        }
    }

    fn spec(&self, symbol: &str) -> Result<&InstrumentSpec, ExecutionError> {
        self.instruments
            .get(symbol)
            .ok_or_else(|| ExecutionError::Rejected(format!("unknown instrument {symbol}")))
    }
}

/// Price at which `bar` fills the position's stop, if it reaches it.
fn stop_fill(pos: &VenuePosition, bar: &PriceBar) -> Option<f64> {
    match pos.direction {
        Direction::Long if bar.open <= pos.stop => Some(bar.open),
        Direction::Long if bar.low <= pos.stop => Some(pos.stop),
        Direction::Short if bar.open >= pos.stop => Some(bar.open),
        Direction::Short if bar.high >= pos.stop => Some(pos.stop),
        _ => None,
    }
}

impl Venue for SimulatedVenue {
    fn bars(
        &mut self,
        instrument: &str,
        _timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<PriceBar>, ExecutionError> {
        let bars = self
            .history
            .get(instrument)
            .ok_or_else(|| ExecutionError::Unavailable(format!("no history for {instrument}")))?;
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }

    fn account_balance(&mut self) -> Result<f64, ExecutionError> {
        Ok(self.balance)
    }

    fn place_order(&mut self, order: &EntryOrder) -> Result<Fill, ExecutionError> {
        let spec = self.spec(&order.instrument)?;
        if order.volume + 1e-9 < spec.min_volume || order.volume > spec.max_volume + 1e-9 {
            return Err(ExecutionError::Rejected(format!(
                "volume {} outside [{}, {}]",
                order.volume, spec.min_volume, spec.max_volume
            )));
        }
        let price = self
            .quotes
            .get(&order.instrument)
            .copied()
            .ok_or_else(|| ExecutionError::Unavailable(format!("no quote for {}", order.instrument)))?;
        if order.direction.favourable(order.stop_price, price) <= 0.0 {
            return Err(ExecutionError::Rejected(format!(
                "stop {} is on the wrong side of {price}",
                order.stop_price
            )));
        }

        self.next_ticket += 1;
        let id = PositionId::new(self.next_ticket.to_string());
        self.positions.insert(
            id.clone(),
            VenuePosition {
                instrument: order.instrument.clone(),
                direction: order.direction,
                entry_price: price,
                volume: order.volume,
                stop: order.stop_price,
            },
        );
        self.registry.register(RegisteredPosition {
            id: id.clone(),
            owner: order.owner.clone(),
            instrument: order.instrument.clone(),
            direction: order.direction,
            volume: order.volume,
            risk_percent: order.risk_percent,
        });

        Ok(Fill {
            id,
            instrument: order.instrument.clone(),
            direction: order.direction,
            price,
            time: self.last_time,
            volume: order.volume,
        })
    }

    fn modify_stop_loss(&mut self, position: &PositionId, new_stop: f64) -> Result<(), ExecutionError> {
        if self.modify_failures > 0 {
            self.modify_failures -= 1;
            return Err(ExecutionError::Unavailable("trade context busy".into()));
        }
        let quote = {
            let pos = self
                .positions
                .get(position)
                .ok_or_else(|| ExecutionError::UnknownPosition(position.clone()))?;
            self.quotes.get(&pos.instrument).copied()
        };
        let Some(pos) = self.positions.get_mut(position) else {
            return Err(ExecutionError::UnknownPosition(position.clone()));
        };
        if let Some(price) = quote {
            if pos.direction.favourable(new_stop, price) <= 0.0 {
                return Err(ExecutionError::Rejected(format!(
                    "stop {new_stop} is through the market at {price}"
                )));
            }
        }
        pos.stop = new_stop;
        Ok(())
    }

    fn min_stop_distance(&mut self, instrument: &str) -> Result<f64, ExecutionError> {
        self.spec(instrument)?;
        Ok(self.min_stop_distance)
    }

    fn close_position(&mut self, position: &PositionId) -> Result<Fill, ExecutionError> {
        let instrument = self
            .positions
            .get(position)
            .map(|p| p.instrument.clone())
            .ok_or_else(|| ExecutionError::UnknownPosition(position.clone()))?;
        let price = self
            .quotes
            .get(&instrument)
            .copied()
            .ok_or_else(|| ExecutionError::Unavailable(format!("no quote for {instrument}")))?;
        let Some(pos) = self.positions.remove(position) else {
            return Err(ExecutionError::UnknownPosition(position.clone()));
        };
        self.registry.remove(position);
        let pnl = self.realised(&pos, price);
        self.balance += pnl;
        tracing::info!(
            position_id = %position,
            instrument = %pos.instrument,
            exit_price = price,
            pnl,
            balance = self.balance,
            "position closed on request"
        );
        self.requested.push(VenueClose {
            id: position.clone(),
            instrument: pos.instrument.clone(),
            exit_price: price,
            time: self.last_time,
            pnl,
        });
        Ok(Fill {
            id: position.clone(),
            instrument: pos.instrument,
            direction: pos.direction,
            price,
            time: self.last_time,
            volume: pos.volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use meanrev_core::domain::OwnerTag;

    fn bar(minute: i64, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        let t = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap() + Duration::minutes(minute);
        PriceBar::new(t, open, high, low, close, 100.0)
    }

    fn venue() -> (SimulatedVenue, SharedRegistry) {
        let registry = SharedRegistry::new();
        let mut venue = SimulatedVenue::new(10_000.0, registry.clone())
            .with_instrument(InstrumentSpec::forex_major("EURUSD"));
        venue.advance("EURUSD", &bar(0, 1.1, 1.1005, 1.0995, 1.1000));
        (venue, registry)
    }

    fn order(direction: Direction, stop: f64) -> EntryOrder {
        EntryOrder {
            instrument: "EURUSD".into(),
            direction,
            volume: 0.5,
            stop_price: stop,
            owner: OwnerTag::new("sim"),
            risk_percent: 1.0,
        }
    }

    #[test]
    fn fills_at_quote_and_registers() {
        let (mut venue, registry) = venue();
        let fill = venue.place_order(&order(Direction::Long, 1.0980)).unwrap();
        assert_eq!(fill.price, 1.1000);
        assert_eq!(registry.len(), 1);
        assert_eq!(venue.stop_of(&fill.id), Some(1.0980));
    }

    #[test]
    fn rejects_stop_on_wrong_side() {
        let (mut venue, registry) = venue();
        assert!(matches!(
            venue.place_order(&order(Direction::Long, 1.1010)),
            Err(ExecutionError::Rejected(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn long_stop_hit_intrabar_fills_at_stop() {
        let (mut venue, registry) = venue();
        let fill = venue.place_order(&order(Direction::Long, 1.0980)).unwrap();

        assert!(venue.advance("EURUSD", &bar(5, 1.1, 1.1010, 1.0990, 1.1005)).is_empty());
        let out = venue.advance("EURUSD", &bar(10, 1.1005, 1.1006, 1.0975, 1.0985));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, fill.id);
        assert_eq!(out[0].exit_price, 1.0980);
        // 20 pips × $10 × 0.5 lots
        assert!((out[0].pnl + 100.0).abs() < 1e-6);
        assert!((venue.balance() - 9_900.0).abs() < 1e-6);
        assert!(registry.is_empty());
    }

    #[test]
    fn short_gap_through_stop_fills_at_open() {
        let (mut venue, _) = venue();
        venue.place_order(&order(Direction::Short, 1.1020)).unwrap();
        let out = venue.advance("EURUSD", &bar(5, 1.1030, 1.1040, 1.1025, 1.1035));
        assert_eq!(out[0].exit_price, 1.1030);
    }

    #[test]
    fn injected_failures_then_recovery() {
        let (mut venue, _) = venue();
        let fill = venue.place_order(&order(Direction::Long, 1.0980)).unwrap();
        venue.inject_modify_failures(2);
        assert!(venue.modify_stop_loss(&fill.id, 1.0990).is_err());
        assert!(venue.modify_stop_loss(&fill.id, 1.0990).is_err());
        venue.modify_stop_loss(&fill.id, 1.0990).unwrap();
        assert_eq!(venue.stop_of(&fill.id), Some(1.0990));
    }

    #[test]
    fn modify_unknown_position_fails() {
        let (mut venue, _) = venue();
        assert!(matches!(
            venue.modify_stop_loss(&PositionId::new("404"), 1.0),
            Err(ExecutionError::UnknownPosition(_))
        ));
    }

    #[test]
    fn requested_close_realises_at_quote() {
        let (mut venue, registry) = venue();
        let fill = venue.place_order(&order(Direction::Short, 1.1020)).unwrap();
        venue.advance("EURUSD", &bar(5, 1.1, 1.1002, 1.0985, 1.0990));

        let exit = venue.close_position(&fill.id).unwrap();
        assert_eq!(exit.price, 1.0990);
        assert_eq!(exit.direction, Direction::Short);
        assert!(registry.is_empty());
        assert_eq!(venue.open_count(), 0);
        // 10 pips × $10 × 0.5 lots
        assert!((venue.balance() - 10_050.0).abs() < 1e-6);

        assert!(venue.take_requested_closes("GBPUSD").is_empty());
        let closes = venue.take_requested_closes("EURUSD");
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].id, fill.id);
        assert!((closes[0].pnl - 50.0).abs() < 1e-6);
        assert!(venue.take_requested_closes("EURUSD").is_empty());

        assert!(matches!(
            venue.close_position(&fill.id),
            Err(ExecutionError::UnknownPosition(_))
        ));
    }

    #[test]
    fn history_serves_most_recent_bars() {
        let (mut venue, _) = venue();
        let bars: Vec<_> = (0..10)
            .map(|i| bar(i, 1.1, 1.1005, 1.0995, 1.1))
            .collect();
        venue.load_history("EURUSD", bars.clone());
        let served = venue.bars("EURUSD", Timeframe::M5, 4).unwrap();
        assert_eq!(served, bars[6..].to_vec());
        assert!(venue.bars("GBPUSD", Timeframe::M5, 4).is_err());
    }

    #[test]
    fn liquidate_closes_at_quote() {
        let (mut venue, registry) = venue();
        venue.place_order(&order(Direction::Long, 1.0980)).unwrap();
        venue.advance("EURUSD", &bar(5, 1.1, 1.1012, 1.0999, 1.1010));
        let out = venue.liquidate();
        assert_eq!(out.len(), 1);
        assert!((out[0].pnl - 50.0).abs() < 1e-6);
        assert_eq!(venue.open_count(), 0);
        assert!(registry.is_empty());
    }
}

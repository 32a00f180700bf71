//! End-to-end worked examples for the three decision stages:
//! trailing stop progression, momentum veto, and portfolio risk cap.

use chrono::{TimeZone, Utc};

use meanrev_core::components::signal::{
    MomentumRsiSignal, RsiReadings, SignalGenerator, SignalKind, VetoReason,
};
use meanrev_core::domain::{
    Direction, Fill, InstrumentSpec, OwnerTag, Position, PositionId, StopStage,
};
use meanrev_core::risk::{RiskEvaluator, RiskLimits, RiskRequest};
use meanrev_core::trailing::{StopReason, TrailingStopEngine, TrailingVariant};
use meanrev_core::venue::RegisteredPosition;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn trailing_stop_progresses_hard_stop_breakeven_trailing() {
    let atr = 0.0010;
    let engine = TrailingStopEngine::from_preset(TrailingVariant::CustomBalanced, 0.1);
    let initial = engine.initial_stop(Direction::Long, 1.1000, atr, 0.0);
    assert_close(initial, 1.0980);

    let fill = Fill {
        id: PositionId::new("5001"),
        instrument: "EURUSD".into(),
        direction: Direction::Long,
        price: 1.1000,
        time: Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap(),
        volume: 0.5,
    };
    let mut pos = Position::open(fill, initial, TrailingVariant::CustomBalanced, 1.0);

    // 1.2 × ATR in profit: breakeven with a 0.1 × ATR buffer
    let update = engine.update(&mut pos, 1.1012, Some(atr)).unwrap().unwrap();
    assert_eq!(update.stage, StopStage::Breakeven);
    assert_eq!(update.reason, StopReason::Breakeven);
    assert_close(pos.stop_price, 1.1001);

    // New extreme: trail 1.5 × ATR behind it
    let update = engine.update(&mut pos, 1.1030, Some(atr)).unwrap().unwrap();
    assert_eq!(update.stage, StopStage::Trailing);
    assert_close(update.previous, 1.1001);
    assert_close(pos.stop_price, 1.1015);
    assert_close(pos.extreme_price, 1.1030);

    // Pullback leaves the stop in place
    assert_eq!(engine.update(&mut pos, 1.1020, Some(atr)).unwrap(), None);
    assert_close(pos.stop_price, 1.1015);
    assert_eq!(pos.stop_history.len(), 2);
}

#[test]
fn weak_recovery_from_oversold_is_vetoed() {
    let signal = MomentumRsiSignal::new(30.0, 70.0, 2.0, 15.0);
    let readings = RsiReadings {
        current: 29.0,
        previous: 28.0,
        previous2: Some(26.0),
    };
    let result = signal.evaluate(&readings);
    assert_eq!(result.kind, SignalKind::None);
    assert!(matches!(
        result.veto,
        Some(VetoReason::InsufficientMomentum { .. })
    ));
}

#[test]
fn strong_recovery_from_oversold_enters_long() {
    let signal = MomentumRsiSignal::new(30.0, 70.0, 2.0, 15.0);
    let readings = RsiReadings {
        current: 27.0,
        previous: 24.0,
        previous2: Some(22.0),
    };
    assert_eq!(signal.evaluate(&readings).kind, SignalKind::EnterLong);
}

#[test]
fn sizing_then_portfolio_cap() {
    let spec = InstrumentSpec::forex_major("EURUSD");
    let evaluator = RiskEvaluator::new(RiskLimits::default());
    let request = |risk: f64| RiskRequest {
        balance: 10_000.0,
        risk_percent: risk,
        stop_distance: 0.0020,
        min_stop_distance: 0.0,
        instrument: &spec,
    };

    let decision = evaluator.evaluate(&request(1.0), &[]);
    assert!(decision.approved);
    assert_close(decision.volume, 0.5);

    let open: Vec<RegisteredPosition> = ["GBPUSD", "USDJPY"]
        .iter()
        .enumerate()
        .map(|(i, symbol)| RegisteredPosition {
            id: PositionId::new(format!("70{i}")),
            owner: OwnerTag::new("desk-1"),
            instrument: symbol.to_string(),
            direction: Direction::Long,
            volume: 0.3,
            risk_percent: 2.0,
        })
        .collect();

    let decision = evaluator.evaluate(&request(2.0), &open);
    assert!(!decision.approved);
    let reason = decision.rejection.expect("rejected decisions carry a reason");
    assert_eq!(reason.code(), "portfolio_cap");
}

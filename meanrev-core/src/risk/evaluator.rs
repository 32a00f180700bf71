//! Risk evaluator.
//!
//! Evaluation order:
//! 1. Validate inputs (`invalid_input`).
//! 2. Clamp the requested risk percent to the per-position cap.
//! 3. Widen the stop to the venue minimum; reject if still zero (`invalid_input`)
//!    or wider than allowed (`stop_too_wide`).
//! 4. Size: risk amount / (stop points × value per point).
//! 5. Cap the volume at min(dynamic max, absolute max, instrument max);
//!    a cap below the minimum volume rejects (`below_min_size`).
//! 6. Floor to the volume step. Below the minimum volume, round up to the
//!    minimum only if that stays within the per-position cap (`per_trade_cap`).
//! 7. Add the committed risk to the owner's open total; over the ceiling rejects
//!    (`portfolio_cap`).

use super::sizing::{raw_volume, risk_percent_of};
use super::{portfolio_risk, RejectionReason, RiskDecision, RiskLimits};
use crate::domain::InstrumentSpec;
use crate::venue::RegisteredPosition;

/// Percent comparisons tolerate float noise at this scale.
const PERCENT_EPSILON: f64 = 1e-9;

/// Inputs to one sizing decision.
#[derive(Debug, Clone)]
pub struct RiskRequest<'a> {
    pub balance: f64,
    pub risk_percent: f64,
    /// Requested stop distance in price units.
    pub stop_distance: f64,
    /// Venue minimum stop distance in price units (0 when none).
    pub min_stop_distance: f64,
    pub instrument: &'a InstrumentSpec,
}

#[derive(Debug, Clone)]
pub struct RiskEvaluator {
    limits: RiskLimits,
}

impl RiskEvaluator {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Size a trade against the owner's currently open positions.
    pub fn evaluate(&self, req: &RiskRequest<'_>, open: &[RegisteredPosition]) -> RiskDecision {
        if let Some(detail) = invalid_input(req) {
            return RiskDecision::reject(RejectionReason::InvalidInput { detail }, req.stop_distance);
        }
        let limits = &self.limits;
        let instrument = req.instrument;

        let risk_percent = req.risk_percent.min(limits.max_risk_percent_per_position);

        let min_stop = req.min_stop_distance.max(0.0);
        let stop_widened = req.stop_distance < min_stop;
        let distance = req.stop_distance.max(min_stop);
        if distance <= 0.0 {
            let detail = format!("stop distance must be positive (got {distance})");
            return RiskDecision::reject(RejectionReason::InvalidInput { detail }, distance);
        }
        if let Some(max) = limits.max_stop_distance {
            if distance > max {
                return RiskDecision::reject(RejectionReason::StopTooWide { distance, max }, distance);
            }
        }

        let max_volume = limits
            .dynamic_max_volume(req.balance)
            .min(instrument.max_volume);
        if max_volume < instrument.min_volume {
            return RiskDecision::reject(
                RejectionReason::BelowMinSize {
                    max_volume,
                    min_volume: instrument.min_volume,
                },
                distance,
            );
        }

        let raw = raw_volume(req.balance, risk_percent, distance, instrument);
        let mut volume = instrument.floor_volume(raw.min(max_volume));
        if volume < instrument.min_volume {
            let at_min = risk_percent_of(req.balance, distance, instrument.min_volume, instrument);
            if at_min > limits.max_risk_percent_per_position + PERCENT_EPSILON {
                return RiskDecision::reject(
                    RejectionReason::PerTradeCap {
                        risk_percent_at_min: at_min,
                        cap: limits.max_risk_percent_per_position,
                    },
                    distance,
                );
            }
            volume = instrument.min_volume;
        }

        let effective = risk_percent_of(req.balance, distance, volume, instrument);
        let committed = risk_percent.max(effective);
        let current = portfolio_risk(open);
        if current + committed > limits.portfolio_risk_ceiling_percent + PERCENT_EPSILON {
            return RiskDecision::reject(
                RejectionReason::PortfolioCap {
                    current,
                    requested: committed,
                    limit: limits.portfolio_risk_ceiling_percent,
                },
                distance,
            );
        }

        RiskDecision::approve(volume, distance, stop_widened, committed)
    }
}

fn invalid_input(req: &RiskRequest<'_>) -> Option<String> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(req.balance) {
        return Some(format!("balance must be positive (got {})", req.balance));
    }
    if !positive(req.risk_percent) {
        return Some(format!("risk percent must be positive (got {})", req.risk_percent));
    }
    // Zero is allowed here: the venue minimum may still widen it.
    if !req.stop_distance.is_finite() || req.stop_distance < 0.0 {
        return Some(format!("stop distance must not be negative (got {})", req.stop_distance));
    }
    if !req.min_stop_distance.is_finite() {
        return Some("venue minimum stop distance is not finite".into());
    }
    if !req.instrument.is_valid() {
        return Some(format!("instrument {} has invalid contract data", req.instrument.symbol));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, OwnerTag, PositionId};

    fn eurusd() -> InstrumentSpec {
        InstrumentSpec::forex_major("EURUSD")
    }

    fn request(instrument: &InstrumentSpec, risk: f64, distance: f64) -> RiskRequest<'_> {
        RiskRequest {
            balance: 10_000.0,
            risk_percent: risk,
            stop_distance: distance,
            min_stop_distance: 0.0,
            instrument,
        }
    }

    fn open_with(risk: f64) -> RegisteredPosition {
        RegisteredPosition {
            id: PositionId::new("900"),
            owner: OwnerTag::new("eurusd-m5"),
            instrument: "EURUSD".into(),
            direction: Direction::Long,
            volume: 1.0,
            risk_percent: risk,
        }
    }

    #[test]
    fn sizes_one_percent_over_twenty_pips() {
        let spec = eurusd();
        let d = RiskEvaluator::new(RiskLimits::default()).evaluate(&request(&spec, 1.0, 0.0020), &[]);
        assert!(d.approved);
        assert!((d.volume - 0.5).abs() < 1e-9);
        assert!((d.committed_risk_percent - 1.0).abs() < 1e-9);
        assert!(!d.stop_widened);
    }

    #[test]
    fn portfolio_ceiling_rejects_overflow() {
        let spec = eurusd();
        let eval = RiskEvaluator::new(RiskLimits::default());
        let open = [open_with(2.0), open_with(2.0)];
        let d = eval.evaluate(&request(&spec, 2.0, 0.0020), &open);
        assert!(!d.approved);
        match d.rejection {
            Some(RejectionReason::PortfolioCap {
                current,
                requested,
                limit,
            }) => {
                assert!((current - 4.0).abs() < 1e-9);
                assert!((requested - 2.0).abs() < 1e-9);
                assert_eq!(limit, 5.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        // A 1 % addition still fits
        assert!(eval.evaluate(&request(&spec, 1.0, 0.0020), &open).approved);
    }

    #[test]
    fn requested_risk_is_clamped() {
        let spec = eurusd();
        let d = RiskEvaluator::new(RiskLimits::default()).evaluate(&request(&spec, 10.0, 0.0020), &[]);
        assert!(d.approved);
        // Clamped to 2 %: $200 / $200 per lot
        assert!((d.volume - 1.0).abs() < 1e-9);
        assert!((d.committed_risk_percent - 2.0).abs() < 1e-9);
    }

    #[test]
    fn widens_stop_to_venue_minimum() {
        let spec = eurusd();
        let mut req = request(&spec, 1.0, 0.0010);
        req.min_stop_distance = 0.0020;
        let d = RiskEvaluator::new(RiskLimits::default()).evaluate(&req, &[]);
        assert!(d.approved);
        assert!(d.stop_widened);
        assert_eq!(d.stop_distance, 0.0020);
        assert!((d.volume - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_distance_is_sized_on_the_venue_minimum() {
        let spec = eurusd();
        let mut req = request(&spec, 1.0, 0.0);
        req.min_stop_distance = 0.0020;
        let d = RiskEvaluator::new(RiskLimits::default()).evaluate(&req, &[]);
        assert!(d.approved);
        assert!(d.stop_widened);
        assert_eq!(d.stop_distance, 0.0020);
        assert!((d.volume - 0.5).abs() < 1e-9);
    }

    #[test]
    fn widened_stop_beyond_max_is_rejected() {
        let spec = eurusd();
        let limits = RiskLimits {
            max_stop_distance: Some(0.0015),
            ..RiskLimits::default()
        };
        let mut req = request(&spec, 1.0, 0.0010);
        req.min_stop_distance = 0.0020;
        let d = RiskEvaluator::new(limits).evaluate(&req, &[]);
        assert_eq!(d.rejection.as_ref().map(|r| r.code()), Some("stop_too_wide"));
    }

    #[test]
    fn volume_is_floored_and_capped() {
        let spec = eurusd();
        // 1 % over 30 pips: 100 / 300 = 0.3333 → 0.33
        let d = RiskEvaluator::new(RiskLimits::default()).evaluate(&request(&spec, 1.0, 0.0030), &[]);
        assert!((d.volume - 0.33).abs() < 1e-9);
        assert!(d.committed_risk_percent >= 0.99 - 1e-9);

        let limits = RiskLimits {
            absolute_max_volume: Some(0.2),
            ..RiskLimits::default()
        };
        let d = RiskEvaluator::new(limits).evaluate(&request(&spec, 1.0, 0.0020), &[]);
        assert!((d.volume - 0.2).abs() < 1e-9);
        // Committed risk never below the clamped request
        assert!((d.committed_risk_percent - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tiny_size_rounds_up_to_minimum_within_cap() {
        let spec = eurusd();
        let mut req = request(&spec, 0.01, 0.0020);
        req.balance = 1_000.0;
        // 0.1 / 200 = 0.0005 lots → min 0.01 lots risks $2 = 0.2 %
        let d = RiskEvaluator::new(RiskLimits::default()).evaluate(&req, &[]);
        assert!(d.approved);
        assert_eq!(d.volume, spec.min_volume);
        assert!((d.committed_risk_percent - 0.2).abs() < 1e-9);
    }

    #[test]
    fn minimum_volume_over_cap_is_rejected() {
        let spec = eurusd();
        let mut req = request(&spec, 1.0, 0.0500);
        req.balance = 200.0;
        // min 0.01 lot over 500 pips = $50 = 25 % of balance
        let limits = RiskLimits {
            dynamic_max_percent: 10.0,
            ..RiskLimits::default()
        };
        let d = RiskEvaluator::new(limits).evaluate(&req, &[]);
        assert_eq!(d.rejection.as_ref().map(|r| r.code()), Some("per_trade_cap"));
    }

    #[test]
    fn volume_cap_below_minimum_is_rejected() {
        let spec = eurusd();
        let mut req = request(&spec, 1.0, 0.0020);
        req.balance = 5.0;
        let d = RiskEvaluator::new(RiskLimits::default()).evaluate(&req, &[]);
        assert_eq!(d.rejection.as_ref().map(|r| r.code()), Some("below_min_size"));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let spec = eurusd();
        let eval = RiskEvaluator::new(RiskLimits::default());
        for (balance, risk, distance) in [
            (0.0, 1.0, 0.002),
            (10_000.0, -1.0, 0.002),
            (10_000.0, 1.0, 0.0),
            (10_000.0, 1.0, -0.002),
            (10_000.0, 1.0, f64::INFINITY),
            (f64::NAN, 1.0, 0.002),
        ] {
            let req = RiskRequest {
                balance,
                risk_percent: risk,
                stop_distance: distance,
                min_stop_distance: 0.0,
                instrument: &spec,
            };
            let d = eval.evaluate(&req, &[]);
            assert_eq!(d.rejection.as_ref().map(|r| r.code()), Some("invalid_input"));
        }
    }
}

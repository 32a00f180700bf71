//! Replay export: JSON report, CSV trade tape, JSONL event log.
//!
//! All persisted reports include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::replay::{ReplayReport, TradeRecord, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &ReplayReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ReplayReport to JSON")
}

/// Deserialize a `ReplayReport`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ReplayReport> {
    let report: ReplayReport =
        serde_json::from_str(json).context("failed to deserialize ReplayReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: position_id, instrument, direction, variant, entry_time,
/// entry_price, exit_time, exit_price, volume, risk_percent, initial_stop,
/// final_stop, final_stage, stop_adjustments, breakeven_triggered, bars_held, pnl
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "position_id",
        "instrument",
        "direction",
        "variant",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "volume",
        "risk_percent",
        "initial_stop",
        "final_stop",
        "final_stage",
        "stop_adjustments",
        "breakeven_triggered",
        "bars_held",
        "pnl",
    ])?;

    for t in trades {
        wtr.write_record([
            t.position_id.clone(),
            t.instrument.clone(),
            t.direction.to_string(),
            t.variant.name().to_string(),
            t.entry_time.to_rfc3339(),
            format!("{:.5}", t.entry_price),
            t.exit_time.to_rfc3339(),
            format!("{:.5}", t.exit_price),
            format!("{:.2}", t.volume),
            format!("{:.4}", t.risk_percent),
            format!("{:.5}", t.initial_stop),
            format!("{:.5}", t.final_stop),
            t.final_stage.to_string(),
            t.stop_adjustments.to_string(),
            t.breakeven_triggered.to_string(),
            t.bars_held.to_string(),
            format!("{:.2}", t.pnl),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// One JSON object per line, in emission order.
pub fn export_events_jsonl(report: &ReplayReport) -> Result<String> {
    let mut out = String::new();
    for event in &report.events {
        let line = serde_json::to_string(event).context("failed to serialize event")?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// Write a report directory under `output_dir`:
/// - `report.json`: full report
/// - `trades.csv`: trade tape
/// - `events.jsonl`: event log
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &ReplayReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", report.instrument, report.fingerprint.short());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&report.trades)?)?;
    std::fs::write(run_dir.join("events.jsonl"), export_events_jsonl(report)?)?;

    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<ReplayReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use meanrev_core::domain::{Direction, ParamsFingerprint, StopStage};
    use meanrev_core::trailing::TrailingVariant;
    use meanrev_core::EngineEvent;

    fn sample_trade() -> TradeRecord {
        let entry = Utc.with_ymd_and_hms(2024, 4, 2, 13, 5, 0).unwrap();
        TradeRecord {
            position_id: "1001".into(),
            instrument: "EURUSD".into(),
            direction: Direction::Long,
            variant: TrailingVariant::CustomBalanced,
            entry_time: entry,
            entry_price: 1.0800,
            exit_time: entry + Duration::minutes(45),
            exit_price: 1.0815,
            volume: 0.5,
            risk_percent: 1.0,
            initial_stop: 1.0780,
            final_stop: 1.0815,
            final_stage: StopStage::Trailing,
            stop_adjustments: 3,
            breakeven_triggered: true,
            bars_held: 9,
            pnl: 75.0,
        }
    }

    fn sample_report() -> ReplayReport {
        ReplayReport {
            schema_version: SCHEMA_VERSION,
            instrument: "EURUSD".into(),
            fingerprint: ParamsFingerprint::from_bytes(b"sample"),
            bars: 120,
            trades: vec![sample_trade()],
            events: vec![EngineEvent::ConfigRejected {
                reason: "oversold must be below overbought".into(),
            }],
            open_position: None,
            initial_balance: 10_000.0,
            final_balance: 10_075.0,
        }
    }

    #[test]
    fn trades_csv_has_header_and_rows() {
        let csv = export_trades_csv(&[sample_trade()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("position_id,instrument,direction"));
        assert!(lines[1].starts_with("1001,EURUSD,"));
        assert!(lines[1].ends_with(",75.00"));
    }

    #[test]
    fn empty_trade_list_is_header_only() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn events_are_one_per_line() {
        let jsonl = export_events_jsonl(&sample_report()).unwrap();
        assert_eq!(jsonl.lines().count(), 1);
        assert!(jsonl.contains(r#""event":"config.rejected""#));
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut report = sample_report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&report).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&report, dir.path()).unwrap();

        assert!(run_dir.join("report.json").exists());
        assert!(run_dir.join("trades.csv").exists());
        assert!(run_dir.join("events.jsonl").exists());

        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.trades.len(), 1);
        assert_eq!(loaded.trades[0].position_id, "1001");
        assert!((loaded.trades[0].entry_price - 1.0800).abs() < 1e-12);
        assert_eq!(loaded.fingerprint, report.fingerprint);
        assert_eq!(loaded.events, report.events);
    }
}

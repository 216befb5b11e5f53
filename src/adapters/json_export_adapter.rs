//! JSON export of a model run.
//!
//! Writes `equity.json` (`[{date, equity}]`, base 1) and `signals.json`
//! (last-session signal plus the headline metrics).

use crate::domain::equity::EquityPoint;
use crate::domain::error::NextOpenError;
use crate::domain::model::ModelRun;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const EQUITY_FILE: &str = "equity.json";
pub const SIGNALS_FILE: &str = "signals.json";

pub const LONG: &str = "LONG";
pub const NONE: &str = "NONE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalsReport {
    pub last_date: Option<NaiveDate>,
    pub signal: String,
    pub n_trades: usize,
    #[serde(rename = "winrate_%")]
    pub winrate_pct: f64,
    #[serde(rename = "avg_trade_%")]
    pub avg_trade_pct: f64,
    pub avg_trade_pts: f64,
    #[serde(rename = "total_ret_%")]
    pub total_ret_pct: f64,
    #[serde(rename = "max_dd_%")]
    pub max_dd_pct: f64,
    #[serde(rename = "cagr_%")]
    pub cagr_pct: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub slope: f64,
}

impl SignalsReport {
    pub fn from_run(run: &ModelRun) -> Self {
        let m = &run.evaluation.metrics;
        Self {
            last_date: run.last_date(),
            signal: signal_label(run.last_signal()).to_string(),
            n_trades: m.n_trades,
            winrate_pct: m.winrate_pct,
            avg_trade_pct: m.avg_trade_pct,
            avg_trade_pts: m.avg_trade_pts,
            total_ret_pct: m.total_ret_pct,
            max_dd_pct: run.equity_check.max_dd_pct,
            cagr_pct: run.equity_check.cagr_pct,
            sharpe: m.sharpe,
            sortino: m.sortino,
            slope: m.slope,
        }
    }
}

pub fn signal_label(active: bool) -> &'static str {
    if active { LONG } else { NONE }
}

fn export_error(path: &Path, e: impl std::fmt::Display) -> NextOpenError {
    NextOpenError::Export {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), NextOpenError> {
    let body = serde_json::to_string_pretty(value).map_err(|e| export_error(path, e))?;
    fs::write(path, body)?;
    Ok(())
}

/// Read back an exported `equity.json`.
pub fn read_equity(path: &Path) -> Result<Vec<EquityPoint>, NextOpenError> {
    let body = fs::read_to_string(path)?;
    serde_json::from_str(&body).map_err(|e| export_error(path, e))
}

#[derive(Debug, Default)]
pub struct JsonExportAdapter;

impl JsonExportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for JsonExportAdapter {
    fn write(&self, run: &ModelRun, output_dir: &Path) -> Result<Vec<PathBuf>, NextOpenError> {
        fs::create_dir_all(output_dir)?;

        let equity_path = output_dir.join(EQUITY_FILE);
        write_json(&equity_path, &run.equity_points()?)?;

        let signals_path = output_dir.join(SIGNALS_FILE);
        write_json(&signals_path, &SignalsReport::from_run(run))?;

        log::info!("exported {} and {}", equity_path.display(), signals_path.display());
        Ok(vec![equity_path, signals_path])
    }
}

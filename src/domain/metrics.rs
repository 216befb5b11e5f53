//! Performance metrics and statistics.
//!
//! All percentages are expressed as `value × 100`. Every function here
//! returns a defined number for degenerate input (empty, constant, too
//! short): never NaN.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DAYS_PER_YEAR: f64 = 365.25;
pub const DEFAULT_POINTS_SCALE: f64 = 40_000.0;
pub const SORTINO_EPSILON: f64 = 1e-9;
pub const MIN_SLOPE_POINTS: usize = 10;

/// Flat summary of one evaluation. Field names on the wire follow the
/// exported payload (`winrate_%`, `max_dd_%`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsResult {
    pub n_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    #[serde(rename = "winrate_%")]
    pub winrate_pct: f64,
    #[serde(rename = "avg_trade_%")]
    pub avg_trade_pct: f64,
    pub avg_trade_pts: f64,
    #[serde(rename = "total_ret_%")]
    pub total_ret_pct: f64,
    pub sharpe: f64,
    pub sortino: f64,
    #[serde(rename = "max_dd_%")]
    pub max_dd_pct: f64,
    #[serde(rename = "cagr_%")]
    pub cagr_pct: f64,
    pub slope: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by n).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Annualized Sharpe and Sortino over per-trade returns.
///
/// Sharpe is 0 when the returns have zero spread. Sortino divides by the
/// spread of the negative returns plus `epsilon`, and is 0 when no return
/// is negative.
pub fn sharpe_sortino(returns: &[f64], annualization_days: f64, epsilon: f64) -> (f64, f64) {
    if returns.is_empty() {
        return (0.0, 0.0);
    }

    let m = mean(returns);
    let scale = annualization_days.sqrt();

    let sd = std_dev(returns);
    let sharpe = if sd == 0.0 { 0.0 } else { m / sd * scale };

    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let sortino = if downside.is_empty() {
        0.0
    } else {
        m / (std_dev(&downside) + epsilon) * scale
    };

    (sharpe, sortino)
}

/// `min(equity / running_max - 1) × 100`; 0 for an empty curve.
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for &e in equity {
        if e > peak {
            peak = e;
        }
        if peak > 0.0 {
            let dd = e / peak - 1.0;
            if dd < worst {
                worst = dd;
            }
        }
    }

    worst * 100.0
}

/// Least-squares slope of `ln(equity)` against a 0-based index.
///
/// Non-positive points are dropped first and the survivors re-indexed
/// 0..k. Fewer than `min_points` survivors gives 0.
pub fn log_equity_slope(equity: &[f64], min_points: usize) -> f64 {
    let y: Vec<f64> = equity
        .iter()
        .copied()
        .filter(|&e| e > 0.0 && e.is_finite())
        .map(f64::ln)
        .collect();

    if y.len() < min_points.max(2) {
        return 0.0;
    }

    let n = y.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(&y);

    let (num, den) = y
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, &yi)| {
            let dx = i as f64 - x_mean;
            (num + dx * (yi - y_mean), den + dx * dx)
        });

    if den == 0.0 { 0.0 } else { num / den }
}

/// Compound annual growth rate in percent from a base-1 final equity.
///
/// Zero when the span is not positive or the final equity is not positive.
pub fn cagr_pct(first: NaiveDate, last: NaiveDate, final_equity: f64) -> f64 {
    let days = (last - first).num_days();
    if days <= 0 || final_equity <= 0.0 || !final_equity.is_finite() {
        return 0.0;
    }
    let years = days as f64 / DAYS_PER_YEAR;
    (final_equity.powf(1.0 / years) - 1.0) * 100.0
}

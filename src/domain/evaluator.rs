//! Next-session trade evaluation.
//!
//! A date is an eligible trade when its signal is `Some(true)` and its
//! forward return is defined and finite. Trade statistics are taken over
//! eligible dates only; the equity curve spans the whole calendar and stays
//! flat between trades.

use crate::domain::calendar::Calendar;
use crate::domain::equity::{to_points, EquityPoint};
use crate::domain::error::NextOpenError;
use crate::domain::metrics::{
    cagr_pct, log_equity_slope, max_drawdown_pct, mean, sharpe_sortino, MetricsResult,
    DEFAULT_POINTS_SCALE, MIN_SLOPE_POINTS, SORTINO_EPSILON, TRADING_DAYS_PER_YEAR,
};
use chrono::NaiveDate;
use std::str::FromStr;

/// Start of the span CAGR is measured over. The end is always the last
/// calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CagrBasis {
    #[default]
    FullCalendar,
    SinceFirstTrade,
}

impl FromStr for CagrBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full_calendar" | "full" => Ok(CagrBasis::FullCalendar),
            "since_first_trade" | "first_trade" => Ok(CagrBasis::SinceFirstTrade),
            other => Err(format!("unknown cagr basis '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    pub annualization_days: f64,
    /// Notional multiplier for `avg_trade_pts`.
    pub points_scale: f64,
    pub sortino_epsilon: f64,
    pub min_slope_points: usize,
    pub cagr_basis: CagrBasis,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            annualization_days: TRADING_DAYS_PER_YEAR,
            points_scale: DEFAULT_POINTS_SCALE,
            sortino_epsilon: SORTINO_EPSILON,
            min_slope_points: MIN_SLOPE_POINTS,
            cagr_basis: CagrBasis::FullCalendar,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub metrics: MetricsResult,
    /// Base-1 equity, one value per calendar date.
    pub equity: Vec<f64>,
    /// Trade return on eligible dates, 0 elsewhere.
    pub daily_returns: Vec<f64>,
    /// Calendar positions of the eligible trades.
    pub trade_positions: Vec<usize>,
}

impl Evaluation {
    pub fn equity_points(&self, calendar: &Calendar) -> Result<Vec<EquityPoint>, NextOpenError> {
        to_points(calendar, &self.equity)
    }

    pub fn trade_dates(&self, calendar: &Calendar) -> Vec<NaiveDate> {
        self.trade_positions
            .iter()
            .map(|&i| calendar.dates()[i])
            .collect()
    }
}

pub struct TradeEvaluator {
    config: EvaluatorConfig,
}

impl TradeEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        forward_returns: &[Option<f64>],
        signal: &[Option<bool>],
        calendar: &Calendar,
    ) -> Result<Evaluation, NextOpenError> {
        let n = calendar.len();
        if forward_returns.len() != n {
            return Err(NextOpenError::alignment("forward returns", n, forward_returns.len()));
        }
        if signal.len() != n {
            return Err(NextOpenError::alignment("signal", n, signal.len()));
        }

        let trade_return = |i: usize| -> Option<f64> {
            match (signal[i], forward_returns[i]) {
                (Some(true), Some(r)) if r.is_finite() => Some(r),
                _ => None,
            }
        };

        let daily: Vec<Option<f64>> = (0..n).map(trade_return).collect();
        let trade_positions: Vec<usize> = (0..n).filter(|&i| daily[i].is_some()).collect();

        if trade_positions.is_empty() {
            log::info!("no eligible trades over {n} calendar dates");
            return Ok(Evaluation {
                metrics: MetricsResult::default(),
                equity: vec![1.0; n],
                daily_returns: vec![0.0; n],
                trade_positions,
            });
        }

        let daily_returns: Vec<f64> = daily.iter().map(|r| r.unwrap_or(0.0)).collect();
        let equity: Vec<f64> = daily_returns
            .iter()
            .scan(1.0, |value, r| {
                *value *= 1.0 + r;
                Some(*value)
            })
            .collect();
        let trade_rets: Vec<f64> = daily.iter().flatten().copied().collect();

        let n_trades = trade_rets.len();
        let winning_trades = trade_rets.iter().filter(|&&r| r > 0.0).count();
        let losing_trades = trade_rets.iter().filter(|&&r| r < 0.0).count();
        let avg = mean(&trade_rets);
        let compounded: f64 = trade_rets.iter().map(|r| 1.0 + r).product();
        let (sharpe, sortino) = sharpe_sortino(
            &trade_rets,
            self.config.annualization_days,
            self.config.sortino_epsilon,
        );

        let dates = calendar.dates();
        let cagr_start = match self.config.cagr_basis {
            CagrBasis::FullCalendar => dates[0],
            CagrBasis::SinceFirstTrade => dates[trade_positions[0]],
        };
        let final_equity = equity[n - 1];

        let metrics = MetricsResult {
            n_trades,
            winning_trades,
            losing_trades,
            winrate_pct: winning_trades as f64 / n_trades as f64 * 100.0,
            avg_trade_pct: avg * 100.0,
            avg_trade_pts: avg * self.config.points_scale,
            total_ret_pct: (compounded - 1.0) * 100.0,
            sharpe,
            sortino,
            max_dd_pct: max_drawdown_pct(&equity),
            cagr_pct: cagr_pct(cagr_start, dates[n - 1], final_equity),
            slope: log_equity_slope(&equity, self.config.min_slope_points),
        };

        log::debug!(
            "evaluated {} trades: win rate {:.1}%, total return {:.2}%",
            metrics.n_trades,
            metrics.winrate_pct,
            metrics.total_ret_pct
        );

        Ok(Evaluation {
            metrics,
            equity,
            daily_returns,
            trade_positions,
        })
    }
}

//! Dated equity curves and the standalone drawdown/CAGR check.

use crate::domain::calendar::Calendar;
use crate::domain::error::NextOpenError;
use crate::domain::metrics::{cagr_pct, max_drawdown_pct};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

pub fn to_points(calendar: &Calendar, equity: &[f64]) -> Result<Vec<EquityPoint>, NextOpenError> {
    if equity.len() != calendar.len() {
        return Err(NextOpenError::alignment("equity", calendar.len(), equity.len()));
    }
    Ok(calendar
        .dates()
        .iter()
        .zip(equity)
        .map(|(&date, &equity)| EquityPoint { date, equity })
        .collect())
}

/// Rebuild a base-1 curve from per-date returns. Undefined returns count
/// as a flat day.
pub fn equity_from_daily_returns(
    calendar: &Calendar,
    daily_returns: &[Option<f64>],
) -> Result<Vec<EquityPoint>, NextOpenError> {
    if daily_returns.len() != calendar.len() {
        return Err(NextOpenError::alignment(
            "daily returns",
            calendar.len(),
            daily_returns.len(),
        ));
    }

    let mut value = 1.0;
    let curve: Vec<f64> = daily_returns
        .iter()
        .map(|r| {
            value *= 1.0 + r.filter(|r| r.is_finite()).unwrap_or(0.0);
            value
        })
        .collect();

    let mut points = to_points(calendar, &curve)?;
    normalize(&mut points);
    Ok(points)
}

/// Divide every point by the first one. A curve starting at zero is left as is.
pub fn normalize(points: &mut [EquityPoint]) {
    let Some(base) = points.first().map(|p| p.equity) else {
        return;
    };
    if base == 0.0 || !base.is_finite() {
        log::warn!("equity curve starts at {base}; leaving it unnormalized");
        return;
    }
    for p in points.iter_mut() {
        p.equity /= base;
    }
}

/// Max drawdown and CAGR recomputed from a dated curve alone.
///
/// Callers normalize first if base-1 semantics are needed. A curve with
/// fewer than two points, or a non-positive span or final value, has a CAGR
/// of 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EquityMetrics {
    #[serde(rename = "max_dd_%")]
    pub max_dd_pct: f64,
    #[serde(rename = "cagr_%")]
    pub cagr_pct: f64,
}

impl EquityMetrics {
    pub fn compute(curve: &[EquityPoint]) -> Self {
        let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
            return Self::default();
        };

        let values: Vec<f64> = curve.iter().map(|p| p.equity).collect();
        let max_dd_pct = max_drawdown_pct(&values);
        let cagr_pct = if curve.len() < 2 {
            0.0
        } else {
            cagr_pct(first.date, last.date, last.equity)
        };

        Self {
            max_dd_pct,
            cagr_pct,
        }
    }
}

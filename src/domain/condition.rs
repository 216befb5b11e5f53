//! Per-date boolean conditions derived from market data.
//!
//! A condition yields one `bool` per calendar date. Any date where an
//! input is undefined evaluates to `false`. A condition whose instrument
//! is absent from the [`MarketData`] evaluates to `None` so the caller can
//! decide whether to omit it.

use crate::domain::calendar::MarketData;
use crate::domain::indicator::{pct_change, rolling_mean};
use crate::domain::ohlcv::PriceField;
use chrono::{Datelike, Weekday};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Lt,
    Ge,
    Gt,
}

impl Comparison {
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Le => lhs <= rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Gt => lhs > rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Le => "LE",
            Comparison::Lt => "LT",
            Comparison::Ge => "GE",
            Comparison::Gt => "GT",
        };
        f.write_str(s)
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "le" | "<=" => Ok(Comparison::Le),
            "lt" | "<" => Ok(Comparison::Lt),
            "ge" | ">=" => Ok(Comparison::Ge),
            "gt" | ">" => Ok(Comparison::Gt),
            other => Err(format!("unknown comparison '{other}'")),
        }
    }
}

/// `field <cmp> factor × rolling_mean(field, window)` on one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSpec {
    pub instrument: String,
    pub field: PriceField,
    pub window: usize,
    pub factor: f64,
    pub comparison: Comparison,
}

impl ConditionSpec {
    pub fn volume_below(instrument: &str, window: usize, factor: f64) -> Self {
        Self {
            instrument: instrument.to_string(),
            field: PriceField::Volume,
            window,
            factor,
            comparison: Comparison::Le,
        }
    }

    /// e.g. `PIRELLI_VOLUME_MA5_LE_90`
    pub fn label(&self) -> String {
        format!(
            "{}_{}_MA{}_{}_{}",
            self.instrument.to_uppercase(),
            self.field,
            self.window,
            self.comparison,
            (self.factor * 100.0).round() as i64
        )
    }

    pub fn evaluate(&self, market: &MarketData) -> Option<Vec<bool>> {
        let instrument = market.get(&self.instrument)?;
        let values = instrument.column(self.field);
        let means = rolling_mean(&values, self.window);

        Some(
            values
                .iter()
                .zip(&means)
                .map(|(v, m)| match (v, m) {
                    (Some(v), Some(m)) if v.is_finite() => {
                        self.comparison.holds(*v, self.factor * m)
                    }
                    _ => false,
                })
                .collect(),
        )
    }
}

/// A condition every signal date must also satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    /// Same-day close-to-close percent return of `instrument` against a
    /// threshold expressed in percent.
    Return {
        instrument: String,
        comparison: Comparison,
        threshold_pct: f64,
    },
    Weekday {
        days: Vec<Weekday>,
    },
}

impl FilterSpec {
    pub fn label(&self) -> String {
        match self {
            FilterSpec::Return {
                instrument,
                comparison,
                threshold_pct,
            } => format!(
                "{}_RET_1D_{}_{}%",
                instrument.to_uppercase(),
                comparison,
                threshold_pct
            ),
            FilterSpec::Weekday { days } => {
                let names: Vec<String> =
                    days.iter().map(|d| d.to_string().to_uppercase()).collect();
                format!("WEEKDAY_IN_{}", names.join("_"))
            }
        }
    }

    pub fn evaluate(&self, market: &MarketData) -> Option<Vec<bool>> {
        match self {
            FilterSpec::Return {
                instrument,
                comparison,
                threshold_pct,
            } => {
                let closes = market.get(instrument)?.column(PriceField::Close);
                Some(
                    pct_change(&closes)
                        .into_iter()
                        .map(|r| r.is_some_and(|r| comparison.holds(r, *threshold_pct)))
                        .collect(),
                )
            }
            FilterSpec::Weekday { days } => Some(
                market
                    .calendar
                    .dates()
                    .iter()
                    .map(|d| days.contains(&d.weekday()))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    fn bar(symbol: &str, day: u32, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            symbol: symbol.to_string(),
            // 2024-01-01 is a Monday
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    fn market(volumes: &[f64]) -> MarketData {
        let bars = volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| bar("FTSEMIB.MI", i as u32 + 1, 100.0, v))
            .collect();
        MarketData::new("ftse", "FTSEMIB.MI", bars).unwrap()
    }

    #[test]
    fn comparison_parse_and_holds() {
        assert_eq!("le".parse::<Comparison>(), Ok(Comparison::Le));
        assert_eq!(">=".parse::<Comparison>(), Ok(Comparison::Ge));
        assert!("eq".parse::<Comparison>().is_err());
        assert!(Comparison::Le.holds(1.0, 1.0));
        assert!(!Comparison::Lt.holds(1.0, 1.0));
        assert!(Comparison::Ge.holds(1.0, 1.0));
        assert!(!Comparison::Gt.holds(1.0, 1.0));
    }

    #[test]
    fn volume_condition_label() {
        let spec = ConditionSpec::volume_below("pirelli", 5, 0.90);
        assert_eq!(spec.label(), "PIRELLI_VOLUME_MA5_LE_90");
    }

    #[test]
    fn volume_condition_warmup_is_false() {
        let m = market(&[100.0, 100.0, 50.0, 100.0]);
        let spec = ConditionSpec::volume_below("ftse", 3, 0.9);
        let out = spec.evaluate(&m).unwrap();
        // MA3 at i=2 is 83.33, 0.9 × 83.33 = 75 ≥ 50
        // MA3 at i=3 is 83.33, 100 > 75
        assert_eq!(out, vec![false, false, true, false]);
    }

    #[test]
    fn volume_condition_absent_instrument() {
        let m = market(&[100.0, 100.0]);
        let spec = ConditionSpec::volume_below("poste", 2, 0.9);
        assert!(spec.evaluate(&m).is_none());
    }

    #[test]
    fn volume_condition_missing_bars_are_false() {
        let mut m = market(&[100.0, 100.0, 100.0, 100.0]);
        m.join(
            "poste",
            "PST.MI",
            vec![
                bar("PST.MI", 1, 10.0, 100.0),
                bar("PST.MI", 2, 10.0, 100.0),
                bar("PST.MI", 4, 10.0, 10.0),
            ],
        )
        .unwrap();
        let spec = ConditionSpec::volume_below("poste", 1, 1.0);
        assert_eq!(spec.evaluate(&m).unwrap(), vec![true, true, false, true]);
    }

    #[test]
    fn return_filter_uses_percent_threshold() {
        let mut m = market(&[1.0, 1.0, 1.0, 1.0]);
        m.join(
            "spx",
            "^GSPC",
            vec![
                bar("^GSPC", 1, 100.0, 0.0),
                bar("^GSPC", 2, 101.0, 0.0),
                bar("^GSPC", 3, 100.0, 0.0),
                bar("^GSPC", 4, 100.0, 0.0),
            ],
        )
        .unwrap();
        let filter = FilterSpec::Return {
            instrument: "spx".into(),
            comparison: Comparison::Ge,
            threshold_pct: 0.0,
        };
        assert_eq!(filter.evaluate(&m).unwrap(), vec![false, true, false, true]);
        assert_eq!(filter.label(), "SPX_RET_1D_GE_0%");
    }

    #[test]
    fn return_filter_absent_instrument() {
        let m = market(&[1.0]);
        let filter = FilterSpec::Return {
            instrument: "spx".into(),
            comparison: Comparison::Ge,
            threshold_pct: 0.0,
        };
        assert!(filter.evaluate(&m).is_none());
    }

    #[test]
    fn weekday_filter() {
        // Mon..Fri, 2024-01-01 to 2024-01-05
        let m = market(&[1.0, 1.0, 1.0, 1.0, 1.0]);
        let filter = FilterSpec::Weekday {
            days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu],
        };
        assert_eq!(filter.evaluate(&m).unwrap(), vec![true, true, true, true, false]);
        assert_eq!(filter.label(), "WEEKDAY_IN_MON_TUE_WED_THU");
    }
}

//! Master calendar and instrument alignment.
//!
//! The master instrument's dates form the [`Calendar`]. Every other
//! instrument is left-joined onto it: dates the instrument lacks become
//! `None`, dates outside the calendar are dropped.

use crate::domain::error::NextOpenError;
use crate::domain::ohlcv::{OhlcvBar, PriceField};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Strictly ascending trading dates with no duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    dates: Vec<NaiveDate>,
}

impl Calendar {
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, NextOpenError> {
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            let reason = if w[0] == w[1] {
                format!("duplicate date {}", w[0])
            } else {
                format!("dates out of order: {} before {}", w[0], w[1])
            };
            return Err(NextOpenError::Calendar { reason });
        }
        Ok(Self { dates })
    }

    pub fn from_bars(bars: &[OhlcvBar]) -> Result<Self, NextOpenError> {
        Self::new(bars.iter().map(|b| b.date).collect())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// One instrument's bars, one slot per calendar date.
#[derive(Debug, Clone)]
pub struct AlignedInstrument {
    pub name: String,
    pub symbol: String,
    pub bars: Vec<Option<OhlcvBar>>,
}

impl AlignedInstrument {
    /// Left-join `bars` onto `calendar`.
    pub fn align(
        name: &str,
        symbol: &str,
        bars: Vec<OhlcvBar>,
        calendar: &Calendar,
    ) -> Result<Self, NextOpenError> {
        let mut by_date: HashMap<NaiveDate, OhlcvBar> = HashMap::with_capacity(bars.len());
        for bar in bars {
            let date = bar.date;
            if by_date.insert(date, bar).is_some() {
                return Err(NextOpenError::Calendar {
                    reason: format!("duplicate date {date} in {symbol}"),
                });
            }
        }

        let aligned = calendar
            .dates()
            .iter()
            .map(|d| by_date.remove(d))
            .collect();

        Ok(Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            bars: aligned,
        })
    }

    pub fn column(&self, field: PriceField) -> Vec<Option<f64>> {
        self.bars
            .iter()
            .map(|b| b.as_ref().map(|bar| bar.field(field)))
            .collect()
    }

    pub fn coverage(&self) -> usize {
        self.bars.iter().filter(|b| b.is_some()).count()
    }
}

/// Master calendar plus every instrument that loaded, keyed by name.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub calendar: Calendar,
    master: String,
    instruments: BTreeMap<String, AlignedInstrument>,
}

impl MarketData {
    /// Build from the master instrument's bars. Bars must be sorted by date.
    pub fn new(master: &str, symbol: &str, bars: Vec<OhlcvBar>) -> Result<Self, NextOpenError> {
        let calendar = Calendar::from_bars(&bars)?;
        let aligned = AlignedInstrument {
            name: master.to_string(),
            symbol: symbol.to_string(),
            bars: bars.into_iter().map(Some).collect(),
        };
        let mut instruments = BTreeMap::new();
        instruments.insert(master.to_string(), aligned);
        Ok(Self {
            calendar,
            master: master.to_string(),
            instruments,
        })
    }

    pub fn join(
        &mut self,
        name: &str,
        symbol: &str,
        bars: Vec<OhlcvBar>,
    ) -> Result<(), NextOpenError> {
        let aligned = AlignedInstrument::align(name, symbol, bars, &self.calendar)?;
        self.instruments.insert(name.to_string(), aligned);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AlignedInstrument> {
        self.instruments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instruments.contains_key(name)
    }

    pub fn master(&self) -> &AlignedInstrument {
        &self.instruments[&self.master]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }
}

#![allow(dead_code)]

use chrono::NaiveDate;
use nextopen::domain::condition::ConditionSpec;
use nextopen::domain::error::NextOpenError;
use nextopen::domain::evaluator::EvaluatorConfig;
use nextopen::domain::model::{InstrumentSpec, ModelConfig};
pub use nextopen::domain::ohlcv::OhlcvBar;
use nextopen::domain::signal::{PatternSpec, SignalConfig};
use nextopen::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, NextOpenError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(NextOpenError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, NextOpenError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, NextOpenError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, date: &str, open: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume,
    }
}

/// Consecutive calendar days; open == close == price, rising by 1 a day.
pub fn generate_bars(
    symbol: &str,
    start_date: &str,
    volumes: &[f64],
    start_price: f64,
) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    volumes
        .iter()
        .enumerate()
        .map(|(i, &volume)| {
            let px = start_price + i as f64;
            OhlcvBar {
                symbol: symbol.to_string(),
                date: start + chrono::Duration::days(i as i64),
                open: px,
                high: px + 1.0,
                low: px - 1.0,
                close: px,
                volume,
            }
        })
        .collect()
}

pub fn volume_pattern(instrument: &str, window: usize, factor: f64) -> PatternSpec {
    PatternSpec::single(instrument, ConditionSpec::volume_below(instrument, window, factor))
}

/// Master `ftse` plus the given auxiliary instruments (name, symbol).
pub fn model_config(aux: &[(&str, &str)], patterns: Vec<PatternSpec>) -> ModelConfig {
    let mut instruments = vec![InstrumentSpec::new("ftse", "FTSEMIB.MI")];
    instruments.extend(aux.iter().map(|(name, symbol)| InstrumentSpec::new(name, symbol)));
    ModelConfig {
        name: "Test".into(),
        master: "ftse".into(),
        start_date: None,
        end_date: None,
        instruments,
        signal: SignalConfig {
            patterns,
            filters: vec![],
        },
        evaluator: EvaluatorConfig::default(),
    }
}

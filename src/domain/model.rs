//! End-to-end model run.
//!
//! Loads the master instrument (which fixes the calendar) and every
//! auxiliary instrument through a [`DataPort`], combines the configured
//! patterns and filters into one signal, prices it at the next session's
//! open, and cross-checks the resulting equity curve.

use crate::domain::calendar::{Calendar, MarketData};
use crate::domain::equity::{equity_from_daily_returns, EquityMetrics, EquityPoint};
use crate::domain::error::NextOpenError;
use crate::domain::evaluator::{Evaluation, EvaluatorConfig, TradeEvaluator};
use crate::domain::forward_return::next_open_returns;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{CombinedSignal, SignalCombinator, SignalConfig};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub name: String,
    pub symbol: String,
    /// Alternate symbols tried in order when `symbol` yields nothing.
    pub fallbacks: Vec<String>,
    pub required: bool,
}

impl InstrumentSpec {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            fallbacks: Vec::new(),
            required: false,
        }
    }

    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.symbol.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    /// Name of the instrument whose dates form the calendar.
    pub master: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub instruments: Vec<InstrumentSpec>,
    pub signal: SignalConfig,
    pub evaluator: EvaluatorConfig,
}

impl ModelConfig {
    pub fn instrument(&self, name: &str) -> Option<&InstrumentSpec> {
        self.instruments.iter().find(|i| i.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ModelRun {
    pub name: String,
    pub market: MarketData,
    pub combined: CombinedSignal,
    pub forward_returns: Vec<Option<f64>>,
    pub evaluation: Evaluation,
    /// Drawdown and CAGR recomputed from the normalized, dated curve.
    pub equity_check: EquityMetrics,
    pub skipped_instruments: Vec<SkippedInstrument>,
}

impl ModelRun {
    pub fn calendar(&self) -> &Calendar {
        &self.market.calendar
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.market.calendar.last()
    }

    /// Signal on the final calendar date, i.e. the instruction for the next open.
    pub fn last_signal(&self) -> bool {
        self.combined.last()
    }

    /// Base-1 curve rebuilt from the per-date returns, as exported.
    pub fn equity_points(&self) -> Result<Vec<EquityPoint>, NextOpenError> {
        let returns: Vec<Option<f64>> =
            self.evaluation.daily_returns.iter().copied().map(Some).collect();
        equity_from_daily_returns(self.calendar(), &returns)
    }
}

/// Symbols held by the data source that no instrument names, primary or fallback.
pub fn unreferenced_symbols(
    port: &dyn DataPort,
    config: &ModelConfig,
) -> Result<Vec<String>, NextOpenError> {
    let referenced: HashSet<&str> = config
        .instruments
        .iter()
        .flat_map(|i| i.candidates())
        .collect();
    let mut symbols: Vec<String> = port
        .list_symbols()?
        .into_iter()
        .filter(|s| !referenced.contains(s.as_str()))
        .collect();
    symbols.sort();
    Ok(symbols)
}

fn fetch_instrument(
    port: &dyn DataPort,
    spec: &InstrumentSpec,
    config: &ModelConfig,
) -> Result<(String, Vec<OhlcvBar>), String> {
    let mut reasons = Vec::new();
    for (attempt, symbol) in spec.candidates().enumerate() {
        if attempt > 0 {
            log::info!("retrying {} with {}", spec.name, symbol);
        }
        match port.fetch_ohlcv(symbol, config.start_date, config.end_date) {
            Ok(bars) if !bars.is_empty() => return Ok((symbol.to_string(), bars)),
            Ok(_) => reasons.push(format!("{symbol}: no rows")),
            Err(e) => reasons.push(format!("{symbol}: {e}")),
        }
    }
    Err(reasons.join("; "))
}

/// Fetch and align every configured instrument.
///
/// The master and any `required` instrument must load; other instruments
/// that fail are skipped and reported.
pub fn load_market(
    port: &dyn DataPort,
    config: &ModelConfig,
) -> Result<(MarketData, Vec<SkippedInstrument>), NextOpenError> {
    let master_spec = config
        .instrument(&config.master)
        .ok_or_else(|| NextOpenError::missing(&format!("instrument.{}", config.master), "symbol"))?;

    log::info!("loading master {} ({})", master_spec.name, master_spec.symbol);
    let (symbol, bars) = fetch_instrument(port, master_spec, config).map_err(|reason| {
        log::error!("master {} unavailable: {}", master_spec.name, reason);
        NextOpenError::NoData {
            symbol: master_spec.symbol.clone(),
        }
    })?;

    let mut market = MarketData::new(&master_spec.name, &symbol, bars)?;
    if let (Some(first), Some(last)) = (market.calendar.first(), market.calendar.last()) {
        log::info!("master calendar {} -> {} ({} dates)", first, last, market.calendar.len());
    }

    let mut skipped = Vec::new();
    for spec in config.instruments.iter().filter(|i| i.name != config.master) {
        match fetch_instrument(port, spec, config) {
            Ok((symbol, bars)) => {
                market.join(&spec.name, &symbol, bars)?;
                if let Some(aligned) = market.get(&spec.name) {
                    log::debug!(
                        "{} ({}): {} of {} calendar dates covered",
                        spec.name,
                        symbol,
                        aligned.coverage(),
                        market.calendar.len()
                    );
                }
            }
            Err(reason) if spec.required => {
                log::error!("required instrument {} unavailable: {}", spec.name, reason);
                return Err(NextOpenError::NoData {
                    symbol: spec.symbol.clone(),
                });
            }
            Err(reason) => {
                log::warn!("excluding {}: {}", spec.name, reason);
                skipped.push(SkippedInstrument {
                    name: spec.name.clone(),
                    reason,
                });
            }
        }
    }

    let used: Vec<&str> = market.names().collect();
    log::info!("instruments in use: {}", used.join(", "));

    Ok((market, skipped))
}

/// Evaluate a model over already-loaded market data.
pub fn evaluate_market(
    name: &str,
    market: MarketData,
    config: &ModelConfig,
    skipped_instruments: Vec<SkippedInstrument>,
) -> Result<ModelRun, NextOpenError> {
    let combinator = SignalCombinator::new(config.signal.clone());
    let combined = combinator.combine(&market);

    let forward_returns = next_open_returns(market.master());
    let signal: Vec<Option<bool>> = combined.signal.iter().copied().map(Some).collect();

    let evaluator = TradeEvaluator::new(config.evaluator.clone());
    let evaluation = evaluator.evaluate(&forward_returns, &signal, &market.calendar)?;

    let mut run = ModelRun {
        name: name.to_string(),
        market,
        combined,
        forward_returns,
        evaluation,
        equity_check: EquityMetrics::default(),
        skipped_instruments,
    };
    run.equity_check = EquityMetrics::compute(&run.equity_points()?);

    Ok(run)
}

pub fn run_model(port: &dyn DataPort, config: &ModelConfig) -> Result<ModelRun, NextOpenError> {
    let (market, skipped) = load_market(port, config)?;
    evaluate_market(&config.name, market, config, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::ConditionSpec;
    use crate::domain::signal::PatternSpec;
    use std::collections::HashMap;

    struct StubPort {
        data: HashMap<String, Vec<OhlcvBar>>,
    }

    impl DataPort for StubPort {
        fn fetch_ohlcv(
            &self,
            symbol: &str,
            _start_date: Option<NaiveDate>,
            _end_date: Option<NaiveDate>,
        ) -> Result<Vec<OhlcvBar>, NextOpenError> {
            self.data.get(symbol).cloned().ok_or_else(|| NextOpenError::DataSource {
                reason: format!("unknown symbol {symbol}"),
            })
        }

        fn list_symbols(&self) -> Result<Vec<String>, NextOpenError> {
            Ok(self.data.keys().cloned().collect())
        }

        fn get_data_range(
            &self,
            _symbol: &str,
        ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, NextOpenError> {
            Ok(None)
        }
    }

    fn bars(symbol: &str, n: u32) -> Vec<OhlcvBar> {
        (1..=n)
            .map(|d| OhlcvBar {
                symbol: symbol.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                open: 100.0 + d as f64,
                high: 101.0 + d as f64,
                low: 99.0 + d as f64,
                close: 100.0 + d as f64,
                volume: 1000.0,
            })
            .collect()
    }

    fn config(instruments: Vec<InstrumentSpec>) -> ModelConfig {
        ModelConfig {
            name: "test".into(),
            master: "ftse".into(),
            start_date: None,
            end_date: None,
            instruments,
            signal: SignalConfig {
                patterns: vec![PatternSpec::single(
                    "ftse",
                    ConditionSpec::volume_below("ftse", 2, 1.0),
                )],
                filters: vec![],
            },
            evaluator: EvaluatorConfig::default(),
        }
    }

    #[test]
    fn fallback_symbol_is_used() {
        let port = StubPort {
            data: HashMap::from([
                ("FTSEMIB.MI".to_string(), bars("FTSEMIB.MI", 5)),
                ("STLA.MI".to_string(), bars("STLA.MI", 5)),
            ]),
        };
        let mut stellantis = InstrumentSpec::new("stellantis", "STLAM.MI");
        stellantis.fallbacks = vec!["STLA.MI".into()];
        let cfg = config(vec![InstrumentSpec::new("ftse", "FTSEMIB.MI"), stellantis]);

        let (market, skipped) = load_market(&port, &cfg).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(market.get("stellantis").unwrap().symbol, "STLA.MI");
    }

    #[test]
    fn unreferenced_symbols_excludes_primaries_and_fallbacks() {
        let port = StubPort {
            data: HashMap::from([
                ("FTSEMIB.MI".to_string(), bars("FTSEMIB.MI", 2)),
                ("STLA.MI".to_string(), bars("STLA.MI", 2)),
                ("UCG.MI".to_string(), bars("UCG.MI", 2)),
                ("ENI.MI".to_string(), bars("ENI.MI", 2)),
            ]),
        };
        let mut stellantis = InstrumentSpec::new("stellantis", "STLAM.MI");
        stellantis.fallbacks = vec!["STLA.MI".into()];
        let cfg = config(vec![InstrumentSpec::new("ftse", "FTSEMIB.MI"), stellantis]);

        assert_eq!(unreferenced_symbols(&port, &cfg).unwrap(), vec!["ENI.MI", "UCG.MI"]);
    }

    #[test]
    fn optional_instrument_is_skipped() {
        let port = StubPort {
            data: HashMap::from([("FTSEMIB.MI".to_string(), bars("FTSEMIB.MI", 5))]),
        };
        let cfg = config(vec![
            InstrumentSpec::new("ftse", "FTSEMIB.MI"),
            InstrumentSpec::new("nexi", "NEXI.MI"),
        ]);
        let (market, skipped) = load_market(&port, &cfg).unwrap();
        assert!(!market.contains("nexi"));
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name, "nexi");
    }

    #[test]
    fn required_instrument_aborts() {
        let port = StubPort {
            data: HashMap::from([("FTSEMIB.MI".to_string(), bars("FTSEMIB.MI", 5))]),
        };
        let mut spx = InstrumentSpec::new("spx", "^GSPC");
        spx.required = true;
        let cfg = config(vec![InstrumentSpec::new("ftse", "FTSEMIB.MI"), spx]);
        let err = load_market(&port, &cfg).unwrap_err();
        assert!(matches!(err, NextOpenError::NoData { ref symbol } if symbol == "^GSPC"));
    }

    #[test]
    fn missing_master_aborts() {
        let port = StubPort {
            data: HashMap::new(),
        };
        let cfg = config(vec![InstrumentSpec::new("ftse", "FTSEMIB.MI")]);
        assert!(matches!(
            run_model(&port, &cfg).unwrap_err(),
            NextOpenError::NoData { .. }
        ));
    }

    #[test]
    fn undeclared_master_is_config_error() {
        let port = StubPort {
            data: HashMap::new(),
        };
        let cfg = config(vec![]);
        assert!(matches!(
            run_model(&port, &cfg).unwrap_err(),
            NextOpenError::ConfigMissing { .. }
        ));
    }

    #[test]
    fn run_model_aligns_every_output() {
        let port = StubPort {
            data: HashMap::from([("FTSEMIB.MI".to_string(), bars("FTSEMIB.MI", 6))]),
        };
        let cfg = config(vec![InstrumentSpec::new("ftse", "FTSEMIB.MI")]);
        let run = run_model(&port, &cfg).unwrap();

        let n = run.calendar().len();
        assert_eq!(n, 6);
        assert_eq!(run.combined.signal.len(), n);
        assert_eq!(run.forward_returns.len(), n);
        assert_eq!(run.evaluation.equity.len(), n);
        assert_eq!(run.forward_returns[n - 1], None);
        // constant volume: v <= 1.0 × MA2 from the second date on
        assert_eq!(run.evaluation.metrics.n_trades, 4);
        assert!(run.last_signal());
        assert_eq!(run.last_date(), NaiveDate::from_ymd_opt(2024, 1, 6));
        assert_eq!(run.equity_points().unwrap().len(), n);
    }
}

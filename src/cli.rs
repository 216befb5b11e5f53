//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_export_adapter::{read_equity, signal_label, JsonExportAdapter};
use crate::domain::condition::{Comparison, ConditionSpec, FilterSpec};
use crate::domain::config_validation::{
    named_sections, parse_date, parse_list, parse_weekdays, validate_model_config,
    FILTER_PREFIX, INSTRUMENT_PREFIX, PATTERN_PREFIX,
};
use crate::domain::equity::EquityMetrics;
use crate::domain::error::NextOpenError;
use crate::domain::evaluator::{CagrBasis, EvaluatorConfig};
use crate::domain::model::{
    run_model, unreferenced_symbols, InstrumentSpec, ModelConfig, ModelRun,
};
use crate::domain::ohlcv::PriceField;
use crate::domain::signal::{PatternSpec, SignalConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "nextopen", about = "Next-session-open signal evaluator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a model and report the last-session signal
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Validate a model configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for every configured instrument and list unused data files
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data_dir: PathBuf,
    },
    /// Recompute drawdown and CAGR from an exported equity.json
    CheckEquity {
        #[arg(short, long)]
        equity: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data_dir,
            output_dir,
        } => run_evaluate(&config, &data_dir, output_dir.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, data_dir } => run_info(&config, &data_dir),
        Command::CheckEquity { equity } => run_check_equity(&equity),
    }
}

fn fail(err: &NextOpenError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = NextOpenError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        fail(&err)
    })
}

/// Validate and load a model configuration in one step.
pub fn load_model_config(path: &Path) -> Result<ModelConfig, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let adapter = load_config(path)?;
    validate_model_config(&adapter).map_err(|e| fail(&e))?;
    build_model_config(&adapter).map_err(|e| fail(&e))
}

pub fn build_model_config(config: &dyn ConfigPort) -> Result<ModelConfig, NextOpenError> {
    let name = config
        .get_string("model", "name")
        .unwrap_or_else(|| "Unnamed".to_string());
    let master = config
        .get_string("model", "master")
        .map(|m| m.trim().to_lowercase())
        .ok_or_else(|| NextOpenError::missing("model", "master"))?;

    let optional_date = |key: &str| -> Result<Option<NaiveDate>, NextOpenError> {
        config
            .get_string("model", key)
            .map(|s| parse_date(&s, "model", key))
            .transpose()
    };

    Ok(ModelConfig {
        name,
        master,
        start_date: optional_date("start_date")?,
        end_date: optional_date("end_date")?,
        instruments: build_instruments(config)?,
        signal: SignalConfig {
            patterns: build_patterns(config)?,
            filters: build_filters(config)?,
        },
        evaluator: build_evaluator_config(config)?,
    })
}

pub fn build_evaluator_config(config: &dyn ConfigPort) -> Result<EvaluatorConfig, NextOpenError> {
    let defaults = EvaluatorConfig::default();
    let cagr_basis = match config.get_string("evaluation", "cagr_basis") {
        Some(s) => s
            .parse::<CagrBasis>()
            .map_err(|reason| NextOpenError::invalid("evaluation", "cagr_basis", reason))?,
        None => defaults.cagr_basis,
    };

    Ok(EvaluatorConfig {
        annualization_days: config.get_double(
            "evaluation",
            "annualization_days",
            defaults.annualization_days,
        ),
        points_scale: config.get_double("evaluation", "points_scale", defaults.points_scale),
        sortino_epsilon: config.get_double(
            "evaluation",
            "sortino_epsilon",
            defaults.sortino_epsilon,
        ),
        min_slope_points: config.get_int(
            "evaluation",
            "min_slope_points",
            defaults.min_slope_points as i64,
        ) as usize,
        cagr_basis,
    })
}

fn build_instruments(config: &dyn ConfigPort) -> Result<Vec<InstrumentSpec>, NextOpenError> {
    named_sections(config, INSTRUMENT_PREFIX)
        .into_iter()
        .map(|name| {
            let section = format!("{INSTRUMENT_PREFIX}{name}");
            let symbol = config
                .get_string(&section, "symbol")
                .map(|s| s.trim().to_string())
                .ok_or_else(|| NextOpenError::missing(&section, "symbol"))?;
            Ok(InstrumentSpec {
                fallbacks: config
                    .get_string(&section, "fallback")
                    .map(|f| parse_list(&f))
                    .unwrap_or_default(),
                required: config.get_bool(&section, "required", false),
                symbol,
                name,
            })
        })
        .collect()
}

fn parse_comparison(config: &dyn ConfigPort, section: &str) -> Result<Comparison, NextOpenError> {
    match config.get_string(section, "comparison") {
        Some(s) => s
            .parse()
            .map_err(|reason| NextOpenError::invalid(section, "comparison", reason)),
        None => Ok(Comparison::Le),
    }
}

fn build_patterns(config: &dyn ConfigPort) -> Result<Vec<PatternSpec>, NextOpenError> {
    named_sections(config, PATTERN_PREFIX)
        .into_iter()
        .map(|name| {
            let section = format!("{PATTERN_PREFIX}{name}");
            let field = match config.get_string(&section, "field") {
                Some(s) => s
                    .parse::<PriceField>()
                    .map_err(|reason| NextOpenError::invalid(&section, "field", reason))?,
                None => PriceField::Volume,
            };
            let window = config.get_int(&section, "window", 0).max(0) as usize;
            let factor = config.get_double(&section, "factor", 1.0);
            let comparison = parse_comparison(config, &section)?;

            let names = config
                .get_string(&section, "legs")
                .map(|l| parse_list(&l))
                .unwrap_or_default();
            if names.is_empty() {
                return Err(NextOpenError::missing(&section, "legs"));
            }

            let legs = names
                .into_iter()
                .map(|instrument| ConditionSpec {
                    instrument: instrument.to_lowercase(),
                    field,
                    window,
                    factor,
                    comparison,
                })
                .collect();

            Ok(PatternSpec { name, legs })
        })
        .collect()
}

fn build_filters(config: &dyn ConfigPort) -> Result<Vec<FilterSpec>, NextOpenError> {
    named_sections(config, FILTER_PREFIX)
        .into_iter()
        .map(|name| {
            let section = format!("{FILTER_PREFIX}{name}");
            let kind = config
                .get_string(&section, "kind")
                .ok_or_else(|| NextOpenError::missing(&section, "kind"))?;

            match kind.trim().to_lowercase().as_str() {
                "return" => Ok(FilterSpec::Return {
                    instrument: config
                        .get_string(&section, "instrument")
                        .map(|s| s.trim().to_lowercase())
                        .ok_or_else(|| NextOpenError::missing(&section, "instrument"))?,
                    comparison: parse_comparison(config, &section)?,
                    threshold_pct: config.get_double(&section, "threshold", 0.0),
                }),
                "weekday" => {
                    let days = config
                        .get_string(&section, "days")
                        .ok_or_else(|| NextOpenError::missing(&section, "days"))?;
                    Ok(FilterSpec::Weekday {
                        days: parse_weekdays(&days, &section)?,
                    })
                }
                other => Err(NextOpenError::invalid(
                    &section,
                    "kind",
                    format!("unknown filter kind '{other}'"),
                )),
            }
        })
        .collect()
}

fn run_evaluate(config_path: &Path, data_dir: &Path, output_dir: Option<&Path>) -> ExitCode {
    let model = match load_model_config(config_path) {
        Ok(m) => m,
        Err(code) => return code,
    };
    eprintln!("Loading model: {}", model.name);

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    run_model_pipeline(&data_port, &model, output_dir)
}

/// Run, summarize and optionally export. Public so tests can drive it with
/// any [`DataPort`].
pub fn run_model_pipeline(
    data_port: &dyn DataPort,
    model: &ModelConfig,
    output_dir: Option<&Path>,
) -> ExitCode {
    let run = match run_model(data_port, model) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    print_summary(&run);

    if let Some(dir) = output_dir {
        match JsonExportAdapter::new().write(&run, dir) {
            Ok(files) => {
                for f in &files {
                    eprintln!("Written: {}", f.display());
                }
            }
            Err(e) => return fail(&e),
        }
    }

    match run.last_date() {
        Some(date) => println!("{} {}", date, signal_label(run.last_signal())),
        None => println!("- {}", signal_label(false)),
    }
    ExitCode::SUCCESS
}

fn print_summary(run: &ModelRun) {
    let cal = run.calendar();
    if let (Some(first), Some(last)) = (cal.first(), cal.last()) {
        eprintln!("Calendar: {} to {} ({} dates)", first, last, cal.len());
    }
    for skipped in &run.skipped_instruments {
        eprintln!("  skipped instrument {}: {}", skipped.name, skipped.reason);
    }
    for skipped in &run.combined.skipped {
        eprintln!("  omitted pattern {}: {}", skipped.name, skipped.reason);
    }
    for label in &run.combined.unavailable_filters {
        eprintln!("  filter {label} has no data");
    }
    eprintln!("Patterns used:    {}", run.combined.used.join(", "));
    eprintln!("Signal dates:     {}", run.combined.trigger_count());

    let m = &run.evaluation.metrics;
    eprintln!("\n=== {} ===", run.name);
    eprintln!(
        "Trades:           {} ({} won, {} lost)",
        m.n_trades, m.winning_trades, m.losing_trades
    );
    eprintln!("Win Rate:         {:.1}%", m.winrate_pct);
    eprintln!("Avg Trade:        {:.3}% ({:.1} pts)", m.avg_trade_pct, m.avg_trade_pts);
    eprintln!("Total Return:     {:.2}%", m.total_ret_pct);
    eprintln!("CAGR:             {:.2}%", m.cagr_pct);
    eprintln!("Max Drawdown:     {:.2}%", m.max_dd_pct);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino);
    eprintln!("Log-Equity Slope: {:.6}", m.slope);
    eprintln!(
        "Curve check:      max dd {:.2}%, cagr {:.2}%",
        run.equity_check.max_dd_pct, run.equity_check.cagr_pct
    );
}

fn run_validate(config_path: &Path) -> ExitCode {
    let model = match load_model_config(config_path) {
        Ok(m) => m,
        Err(code) => return code,
    };

    eprintln!("\nModel: {}", model.name);
    eprintln!("Master: {}", model.master);

    eprintln!("\nInstruments:");
    for inst in &model.instruments {
        let mut line = format!("  {}: {}", inst.name, inst.symbol);
        if !inst.fallbacks.is_empty() {
            line.push_str(&format!(" (fallback {})", inst.fallbacks.join(", ")));
        }
        if inst.required {
            line.push_str(" [required]");
        }
        eprintln!("{line}");
    }

    eprintln!("\nPatterns (OR):");
    for p in &model.signal.patterns {
        eprintln!("  {}: {}", p.name, p.label());
    }

    if !model.signal.filters.is_empty() {
        eprintln!("\nFilters (AND):");
        for f in &model.signal.filters {
            eprintln!("  {}", f.label());
        }
    }

    eprintln!("\nModel configuration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, data_dir: &Path) -> ExitCode {
    let model = match load_model_config(config_path) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    report_data_coverage(&adapter, &model)
}

/// Print each instrument's data range, then the symbols no instrument uses.
pub fn report_data_coverage(port: &dyn DataPort, model: &ModelConfig) -> ExitCode {
    for inst in &model.instruments {
        for symbol in inst.candidates() {
            match port.get_data_range(symbol) {
                Ok(Some((min_date, max_date, count))) => {
                    println!(
                        "{} ({}): {} bars, {} to {}",
                        inst.name, symbol, count, min_date, max_date
                    );
                }
                Ok(None) => eprintln!("{} ({}): no data found", inst.name, symbol),
                Err(e) => eprintln!("error querying {} ({}): {}", inst.name, symbol, e),
            }
        }
    }

    match unreferenced_symbols(port, model) {
        Ok(unused) if unused.is_empty() => {}
        Ok(unused) => eprintln!("\nUnused symbols: {}", unused.join(", ")),
        Err(e) => return fail(&e),
    }
    ExitCode::SUCCESS
}

fn run_check_equity(path: &Path) -> ExitCode {
    let curve = match read_equity(path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if curve.is_empty() {
        eprintln!("warning: {} holds no points", path.display());
    }

    let m = EquityMetrics::compute(&curve);
    eprintln!("Points:       {}", curve.len());
    println!("max_dd_% {:.4}", m.max_dd_pct);
    println!("cagr_% {:.4}", m.cagr_pct);
    ExitCode::SUCCESS
}

//! Configuration validation.
//!
//! Validates the model, evaluation, instrument, pattern and filter sections
//! before any data is fetched.

use crate::domain::condition::Comparison;
use crate::domain::error::NextOpenError;
use crate::domain::evaluator::CagrBasis;
use crate::domain::ohlcv::PriceField;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, Weekday};

pub const INSTRUMENT_PREFIX: &str = "instrument.";
pub const PATTERN_PREFIX: &str = "pattern.";
pub const FILTER_PREFIX: &str = "filter.";

/// Names of every section starting with `prefix`, prefix stripped, sorted.
pub fn named_sections(config: &dyn ConfigPort, prefix: &str) -> Vec<String> {
    config
        .sections()
        .iter()
        .filter_map(|s| s.strip_prefix(prefix))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a comma list, trimming entries and dropping empty ones.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, NextOpenError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        NextOpenError::invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
    })
}

pub fn parse_weekdays(value: &str, section: &str) -> Result<Vec<Weekday>, NextOpenError> {
    let days = parse_list(value)
        .iter()
        .map(|d| {
            d.parse::<Weekday>()
                .map_err(|_| {
                    NextOpenError::invalid(section, "days", format!("unknown weekday '{d}'"))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if days.is_empty() {
        return Err(NextOpenError::invalid(section, "days", "at least one weekday is required"));
    }
    Ok(days)
}

pub fn validate_model_config(config: &dyn ConfigPort) -> Result<(), NextOpenError> {
    let instruments = named_sections(config, INSTRUMENT_PREFIX);
    validate_master(config, &instruments)?;
    validate_dates(config)?;
    validate_evaluation(config)?;
    validate_instruments(config, &instruments)?;
    validate_patterns(config, &instruments)?;
    validate_filters(config, &instruments)?;
    Ok(())
}

fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, NextOpenError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(NextOpenError::missing(section, key)),
    }
}

fn validate_master(config: &dyn ConfigPort, instruments: &[String]) -> Result<(), NextOpenError> {
    let master = require_string(config, "model", "master")?.to_lowercase();
    if !instruments.contains(&master) {
        return Err(NextOpenError::invalid(
            "model",
            "master",
            format!("master '{master}' has no [instrument.{master}] section"),
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), NextOpenError> {
    let start = config
        .get_string("model", "start_date")
        .map(|s| parse_date(&s, "model", "start_date"))
        .transpose()?;
    let end = config
        .get_string("model", "end_date")
        .map(|s| parse_date(&s, "model", "end_date"))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(NextOpenError::invalid(
                "model",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

fn validate_evaluation(config: &dyn ConfigPort) -> Result<(), NextOpenError> {
    for key in ["annualization_days", "points_scale", "sortino_epsilon"] {
        let value = config.get_double("evaluation", key, 1.0);
        if !value.is_finite() || value <= 0.0 {
            return Err(NextOpenError::invalid(
                "evaluation",
                key,
                format!("{key} must be positive"),
            ));
        }
    }

    if config.get_int("evaluation", "min_slope_points", 2) < 2 {
        return Err(NextOpenError::invalid(
            "evaluation",
            "min_slope_points",
            "min_slope_points must be at least 2",
        ));
    }

    if let Some(basis) = config.get_string("evaluation", "cagr_basis") {
        basis
            .parse::<CagrBasis>()
            .map_err(|reason| NextOpenError::invalid("evaluation", "cagr_basis", reason))?;
    }
    Ok(())
}

fn validate_instruments(
    config: &dyn ConfigPort,
    instruments: &[String],
) -> Result<(), NextOpenError> {
    for name in instruments {
        let section = format!("{INSTRUMENT_PREFIX}{name}");
        require_string(config, &section, "symbol")?;
    }
    Ok(())
}

fn check_declared(
    instrument: &str,
    instruments: &[String],
    section: &str,
    key: &str,
) -> Result<(), NextOpenError> {
    if !instruments.iter().any(|i| i == &instrument.to_lowercase()) {
        return Err(NextOpenError::invalid(
            section,
            key,
            format!("instrument '{instrument}' is not declared"),
        ));
    }
    Ok(())
}

fn validate_patterns(config: &dyn ConfigPort, instruments: &[String]) -> Result<(), NextOpenError> {
    let patterns = named_sections(config, PATTERN_PREFIX);
    if patterns.is_empty() {
        return Err(NextOpenError::missing("pattern.<name>", "legs"));
    }

    for name in &patterns {
        let section = format!("{PATTERN_PREFIX}{name}");

        let legs = parse_list(&require_string(config, &section, "legs")?);
        if legs.is_empty() {
            return Err(NextOpenError::missing(&section, "legs"));
        }
        for leg in &legs {
            check_declared(leg, instruments, &section, "legs")?;
        }

        if let Some(field) = config.get_string(&section, "field") {
            field
                .parse::<PriceField>()
                .map_err(|reason| NextOpenError::invalid(&section, "field", reason))?;
        }

        if config.get_int(&section, "window", 0) < 1 {
            return Err(NextOpenError::invalid(
                &section,
                "window",
                "window must be at least 1",
            ));
        }

        let factor = config.get_double(&section, "factor", 0.0);
        if !factor.is_finite() || factor <= 0.0 {
            return Err(NextOpenError::invalid(
                &section,
                "factor",
                "factor must be positive",
            ));
        }

        if let Some(cmp) = config.get_string(&section, "comparison") {
            cmp.parse::<Comparison>()
                .map_err(|reason| NextOpenError::invalid(&section, "comparison", reason))?;
        }
    }
    Ok(())
}

fn validate_filters(config: &dyn ConfigPort, instruments: &[String]) -> Result<(), NextOpenError> {
    for name in named_sections(config, FILTER_PREFIX) {
        let section = format!("{FILTER_PREFIX}{name}");
        let kind = require_string(config, &section, "kind")?.to_lowercase();

        match kind.as_str() {
            "return" => {
                let instrument = require_string(config, &section, "instrument")?;
                check_declared(&instrument, instruments, &section, "instrument")?;
                require_string(config, &section, "comparison")?
                    .parse::<Comparison>()
                    .map_err(|reason| NextOpenError::invalid(&section, "comparison", reason))?;
                let threshold = config.get_double(&section, "threshold", 0.0);
                if !threshold.is_finite() {
                    return Err(NextOpenError::invalid(
                        &section,
                        "threshold",
                        "threshold must be finite",
                    ));
                }
            }
            "weekday" => {
                parse_weekdays(&require_string(config, &section, "days")?, &section)?;
            }
            other => {
                return Err(NextOpenError::invalid(
                    &section,
                    "kind",
                    format!("unknown filter kind '{other}'"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const BASE: &str = "
[model]
master = ftse

[instrument.ftse]
symbol = FTSEMIB.MI

[instrument.pirelli]
symbol = PIRC.MI

[pattern.pirelli]
legs = pirelli
field = volume
window = 5
factor = 0.9
";

    fn make_config(extra: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(&format!("{BASE}{extra}")).unwrap()
    }

    fn from(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_model_config_passes() {
        let config = make_config(
            "
[evaluation]
annualization_days = 252
cagr_basis = since_first_trade

[instrument.spx]
symbol = ^GSPC

[filter.spx_up]
kind = return
instrument = spx
comparison = ge
threshold = 0.0

[filter.midweek]
kind = weekday
days = mon,tue,wed,thu
",
        );
        assert!(validate_model_config(&config).is_ok());
    }

    #[test]
    fn missing_master_fails() {
        let config = from(
            "[instrument.ftse]\nsymbol = X\n[pattern.a]\nlegs = ftse\nwindow = 5\nfactor = 0.9\n",
        );
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigMissing { key, .. } if key == "master"));
    }

    #[test]
    fn undeclared_master_fails() {
        let config = from("[model]\nmaster = dax\n[instrument.ftse]\nsymbol = X\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "master"));
    }

    #[test]
    fn start_after_end_fails() {
        let config = from(&BASE.replace(
            "master = ftse",
            "master = ftse\nstart_date = 2024-01-01\nend_date = 2020-01-01",
        ));
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_date_format_fails() {
        let config = from(&BASE.replace("master = ftse", "master = ftse\nend_date = 2024/01/01"));
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "end_date"));
    }

    #[test]
    fn instrument_without_symbol_fails() {
        let config = make_config("[instrument.nexi]\nfallback = NEXI.MI\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(
            matches!(err, NextOpenError::ConfigMissing { section, key }
                if section == "instrument.nexi" && key == "symbol")
        );
    }

    #[test]
    fn no_patterns_fails() {
        let config = from("[model]\nmaster = ftse\n[instrument.ftse]\nsymbol = X\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigMissing { .. }));
    }

    #[test]
    fn zero_window_fails() {
        let config = from(&BASE.replace("window = 5", "window = 0"));
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "window"));
    }

    #[test]
    fn non_positive_factor_fails() {
        let config = from(&BASE.replace("factor = 0.9", "factor = -0.9"));
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "factor"));
    }

    #[test]
    fn unknown_field_fails() {
        let config = from(&BASE.replace("field = volume", "field = vwap"));
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "field"));
    }

    #[test]
    fn undeclared_leg_fails() {
        let config = from(&BASE.replace("legs = pirelli", "legs = pirelli, unipol"));
        let err = validate_model_config(&config).unwrap_err();
        assert!(
            matches!(err, NextOpenError::ConfigInvalid { key, reason, .. }
                if key == "legs" && reason.contains("unipol"))
        );
    }

    #[test]
    fn bad_comparison_fails() {
        let config =
            make_config("[pattern.x]\nlegs = ftse\nwindow = 3\nfactor = 1\ncomparison = about\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "comparison"));
    }

    #[test]
    fn return_filter_needs_declared_instrument() {
        let config =
            make_config("[filter.spx]\nkind = return\ninstrument = spx\ncomparison = ge\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "instrument"));
    }

    #[test]
    fn unknown_filter_kind_fails() {
        let config = make_config("[filter.x]\nkind = moon_phase\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "kind"));
    }

    #[test]
    fn bad_weekday_fails() {
        let config = make_config("[filter.x]\nkind = weekday\ndays = mon, someday\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "days"));
    }

    #[test]
    fn non_positive_annualization_fails() {
        let config = make_config("[evaluation]\nannualization_days = 0\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(
            matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "annualization_days")
        );
    }

    #[test]
    fn unknown_cagr_basis_fails() {
        let config = make_config("[evaluation]\ncagr_basis = lifetime\n");
        let err = validate_model_config(&config).unwrap_err();
        assert!(matches!(err, NextOpenError::ConfigInvalid { key, .. } if key == "cagr_basis"));
    }

    #[test]
    fn parse_list_trims_and_drops_empty() {
        assert_eq!(parse_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn parse_weekdays_accepts_short_and_long_names() {
        let days = parse_weekdays("mon, Tuesday,THU", "filter.x").unwrap();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Tue, Weekday::Thu]);
    }
}

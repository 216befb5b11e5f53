//! Signal combination.
//!
//! The final signal is `OR(patterns) AND AND(filters)`. Each pattern is
//! itself an AND of one or more [`ConditionSpec`] legs. Patterns are folded
//! over the instruments that actually loaded: a pattern with any absent
//! leg is left out of the OR-set and reported in
//! [`CombinedSignal::skipped`], as is a pattern with no legs at all. An
//! empty OR-set yields an all-false signal.

use crate::domain::calendar::MarketData;
use crate::domain::condition::{ConditionSpec, FilterSpec};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct PatternSpec {
    pub name: String,
    pub legs: Vec<ConditionSpec>,
}

impl PatternSpec {
    pub fn single(name: &str, leg: ConditionSpec) -> Self {
        Self {
            name: name.to_string(),
            legs: vec![leg],
        }
    }

    pub fn label(&self) -> String {
        self.legs
            .iter()
            .map(ConditionSpec::label)
            .collect::<Vec<_>>()
            .join("_AND_")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalConfig {
    pub patterns: Vec<PatternSpec>,
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OmitReason {
    MissingInstrument(String),
    NoLegs,
}

impl fmt::Display for OmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmitReason::MissingInstrument(name) => write!(f, "instrument {name} unavailable"),
            OmitReason::NoLegs => write!(f, "no legs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPattern {
    pub name: String,
    pub reason: OmitReason,
}

#[derive(Debug, Clone)]
pub struct CombinedSignal {
    pub signal: Vec<bool>,
    pub used: Vec<String>,
    pub skipped: Vec<SkippedPattern>,
    /// Filters whose instrument was absent; each contributed all-false.
    pub unavailable_filters: Vec<String>,
}

impl CombinedSignal {
    pub fn trigger_count(&self) -> usize {
        self.signal.iter().filter(|&&s| s).count()
    }

    pub fn last(&self) -> bool {
        self.signal.last().copied().unwrap_or(false)
    }
}

pub struct SignalCombinator {
    config: SignalConfig,
}

impl SignalCombinator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn combine(&self, market: &MarketData) -> CombinedSignal {
        let n = market.calendar.len();
        let mut used = Vec::new();
        let mut skipped = Vec::new();

        let or_set = self
            .config
            .patterns
            .iter()
            .filter_map(|pattern| match evaluate_pattern(pattern, market, n) {
                Ok(series) => {
                    used.push(pattern.name.clone());
                    Some(series)
                }
                Err(reason) => {
                    log::warn!(
                        "omitting pattern {} ({}): {}",
                        pattern.name,
                        pattern.label(),
                        reason
                    );
                    skipped.push(SkippedPattern {
                        name: pattern.name.clone(),
                        reason,
                    });
                    None
                }
            })
            .fold(vec![false; n], |acc, series| or_into(acc, &series));

        let mut unavailable_filters = Vec::new();
        let signal = self.config.filters.iter().fold(or_set, |acc, filter| {
            match filter.evaluate(market) {
                Some(series) => and_into(acc, &series),
                None => {
                    log::warn!(
                        "filter {} has no input data; no date passes it",
                        filter.label()
                    );
                    unavailable_filters.push(filter.label());
                    vec![false; n]
                }
            }
        });

        log::debug!(
            "combined {} of {} patterns and {} filters",
            used.len(),
            self.config.patterns.len(),
            self.config.filters.len()
        );

        CombinedSignal {
            signal,
            used,
            skipped,
            unavailable_filters,
        }
    }
}

fn evaluate_pattern(
    pattern: &PatternSpec,
    market: &MarketData,
    n: usize,
) -> Result<Vec<bool>, OmitReason> {
    if pattern.legs.is_empty() {
        return Err(OmitReason::NoLegs);
    }
    pattern.legs.iter().try_fold(vec![true; n], |acc, leg| {
        leg.evaluate(market)
            .map(|series| and_into(acc, &series))
            .ok_or_else(|| OmitReason::MissingInstrument(leg.instrument.clone()))
    })
}

fn or_into(mut acc: Vec<bool>, series: &[bool]) -> Vec<bool> {
    for (a, &s) in acc.iter_mut().zip(series) {
        *a |= s;
    }
    acc
}

fn and_into(mut acc: Vec<bool>, series: &[bool]) -> Vec<bool> {
    for (a, &s) in acc.iter_mut().zip(series) {
        *a &= s;
    }
    acc
}

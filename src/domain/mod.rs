//! Core domain types and logic.

pub mod ohlcv;
pub mod calendar;
pub mod indicator;
pub mod condition;
pub mod signal;
pub mod forward_return;
pub mod metrics;
pub mod equity;
pub mod evaluator;
pub mod model;
pub mod config_validation;
pub mod error;

//! Indicators over calendar-aligned columns.
//!
//! Every input and output holds one `Option<f64>` per calendar date. `None`
//! marks an undefined value (missing input or warmup) and is never read as
//! zero.

pub mod pct_change;
pub mod rolling_mean;

pub use pct_change::pct_change;
pub use rolling_mean::rolling_mean;

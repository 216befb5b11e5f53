//! Market data source port.
//!
//! Implementations return a symbol's daily bars sorted by date. An unknown
//! symbol is an error; a known symbol with no rows in range is `Ok(vec![])`.

use crate::domain::error::NextOpenError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, NextOpenError>;

    fn list_symbols(&self) -> Result<Vec<String>, NextOpenError>;

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, NextOpenError>;
}

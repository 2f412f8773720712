//! Data access port trait.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` with `start <= date <= end`, ordered by timestamp.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SigtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError>;
}

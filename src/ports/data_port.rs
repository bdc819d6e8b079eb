//! Data access port trait.

use crate::domain::error::LevelscopeError;
use crate::domain::ohlcv::{DateRange, PriceSeries};
use chrono::NaiveDate;

/// Supplies price history per instrument.
///
/// Implementations report every failure (missing source, malformed rows,
/// nothing in the requested window) as
/// [`LevelscopeError::DataUnavailable`]; they never hand back an empty series.
pub trait DataPort {
    fn fetch_series(
        &self,
        instrument: &str,
        window: Option<DateRange>,
    ) -> Result<PriceSeries, LevelscopeError>;

    fn list_instruments(&self) -> Result<Vec<String>, LevelscopeError>;

    /// First date, last date and bar count, or `None` when nothing is stored.
    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LevelscopeError>;
}

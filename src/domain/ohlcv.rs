//! OHLCV bars, price series and date windows.

use crate::domain::error::LevelscopeError;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Bars ordered by strictly increasing date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    /// Fails when dates are not strictly increasing (this covers duplicates).
    pub fn new(bars: Vec<OhlcvBar>) -> Result<Self, LevelscopeError> {
        if let Some(pair) = bars.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(LevelscopeError::invalid_argument(
                "series",
                format!(
                    "dates must be strictly increasing ({} followed by {})",
                    pair[0].date, pair[1].date
                ),
            ));
        }
        Ok(Self { bars })
    }

    /// Sorts by date first; duplicate dates are still rejected.
    pub fn from_unsorted(mut bars: Vec<OhlcvBar>) -> Result<Self, LevelscopeError> {
        bars.sort_by_key(|b| b.date);
        Self::new(bars)
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &self.bars[i])
    }

    /// Subslices of a valid series stay ordered, so no re-validation.
    pub(crate) fn from_slice(bars: &[OhlcvBar]) -> Self {
        Self {
            bars: bars.to_vec(),
        }
    }
}

/// Inclusive calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, LevelscopeError> {
        if start > end {
            return Err(LevelscopeError::invalid_argument(
                "date_range",
                format!("start {start} is after end {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

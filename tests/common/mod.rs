#![allow(dead_code)]

use chrono::NaiveDate;
use levelscope::domain::error::LevelscopeError;
pub use levelscope::domain::ohlcv::{DateRange, OhlcvBar, PriceSeries};
use levelscope::ports::data_port::DataPort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub fetches: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        instrument: &str,
        window: Option<DateRange>,
    ) -> Result<PriceSeries, LevelscopeError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(instrument) {
            return Err(LevelscopeError::data_unavailable(instrument, reason.clone()));
        }
        let mut bars = self
            .data
            .get(instrument)
            .cloned()
            .ok_or_else(|| LevelscopeError::data_unavailable(instrument, "unknown instrument"))?;
        if let Some(range) = window {
            bars.retain(|b| range.contains(b.date));
        }
        if bars.is_empty() {
            return Err(LevelscopeError::data_unavailable(
                instrument,
                "no rows in requested window",
            ));
        }
        PriceSeries::from_unsorted(bars)
    }

    fn list_instruments(&self) -> Result<Vec<String>, LevelscopeError> {
        let mut ids: Vec<String> = self.data.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LevelscopeError> {
        match self.data.get(instrument) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Bar with `high = low = open = close`, so pivots follow the closes.
pub fn flat_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000,
    }
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// Consecutive calendar days starting at `start_date`, one flat bar per close.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000,
        })
        .collect()
}

pub fn series_from_closes(start_date: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(bars_from_closes(start_date, closes)).unwrap()
}

/// Closes that dip to `support` and peak at `resistance` every eight bars,
/// so pivots repeat at the same two prices.
pub fn zigzag(cycles: usize, support: f64, resistance: f64) -> Vec<f64> {
    let step = (resistance - support) / 4.0;
    let mut closes = Vec::new();
    for _ in 0..cycles {
        for k in 0..4 {
            closes.push(support + step * k as f64);
        }
        for k in 0..4 {
            closes.push(resistance - step * k as f64);
        }
    }
    closes.push(support);
    closes
}

//! CSV directory data adapter.
//!
//! One `<instrument>.csv` per instrument. Columns are located by header name
//! (case-insensitive): `date` or `datetime`, `open`, `high`, `low`, `close`
//! and an optional `volume`. Timestamps keep only their calendar date.

use crate::domain::error::LevelscopeError;
use crate::domain::ohlcv::{DateRange, OhlcvBar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, String> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |names: &[&str]| find(names).ok_or_else(|| format!("missing {} column", names[0]));
        Ok(Self {
            date: require(&["date", "datetime"])?,
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close"])?,
            volume: find(&["volume"]),
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }

    fn read_bars(&self, instrument: &str) -> Result<Vec<OhlcvBar>, String> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| format!("CSV header error: {}", e))?
            .clone();
        let cols = Columns::locate(&headers)?;

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| format!("CSV parse error: {}", e))?;
            // header is line 1
            let line = row + 2;
            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| format!("line {line}: missing {name} value"))
            };
            let price = |idx: usize, name: &str| -> Result<f64, String> {
                let raw = field(idx, name)?;
                let value: f64 = raw
                    .parse()
                    .map_err(|e| format!("line {line}: invalid {name} value '{raw}': {e}"))?;
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(format!("line {line}: non-finite {name} value"))
                }
            };

            let date = parse_date(field(cols.date, "date")?)
                .ok_or_else(|| format!("line {line}: invalid date format"))?;
            let volume = match cols.volume {
                Some(idx) => parse_volume(field(idx, "volume")?)
                    .ok_or_else(|| format!("line {line}: invalid volume value"))?,
                None => 0,
            };

            bars.push(OhlcvBar {
                date,
                open: price(cols.open, "open")?,
                high: price(cols.high, "high")?,
                low: price(cols.low, "low")?,
                close: price(cols.close, "close")?,
                volume,
            });
        }
        Ok(bars)
    }
}

/// `YYYY-MM-DD`, optionally followed by a time and offset.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_volume(raw: &str) -> Option<i64> {
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        instrument: &str,
        window: Option<DateRange>,
    ) -> Result<PriceSeries, LevelscopeError> {
        let mut bars = self
            .read_bars(instrument)
            .map_err(|reason| LevelscopeError::data_unavailable(instrument, reason))?;

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
            .map_err(|e| LevelscopeError::data_unavailable(instrument, e.to_string()))
    }

    fn list_instruments(&self) -> Result<Vec<String>, LevelscopeError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| LevelscopeError::Database {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LevelscopeError::Database {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    instruments.push(stem.to_string());
                }
            }
        }

        instruments.sort();
        Ok(instruments)
    }

    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LevelscopeError> {
        if !self.csv_path(instrument).exists() {
            return Ok(None);
        }
        let bars = self
            .read_bars(instrument)
            .map_err(|reason| LevelscopeError::data_unavailable(instrument, reason))?;
        let first = bars.iter().map(|b| b.date).min();
        let last = bars.iter().map(|b| b.date).max();
        Ok(first.zip(last).map(|(f, l)| (f, l, bars.len())))
    }
}

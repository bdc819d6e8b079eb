//! Orchestration between the data port, the level cache and the domain.
//!
//! The domain functions never fetch; everything here does, and failures
//! come back classified so callers decide whether to skip or abort.

use crate::domain::error::LevelscopeError;
use crate::domain::levels::{self, DetectParams, LevelReport};
use crate::domain::normalize::{self, Normalization};
use crate::domain::ohlcv::{DateRange, PriceSeries};
use crate::domain::ratio::{self, RatioSeries};
use crate::domain::timeline;
use crate::ports::cache_port::{LevelCache, LevelCacheKey};
use crate::ports::data_port::DataPort;
use rayon::prelude::*;
use std::collections::BTreeMap;

pub type LevelOutcome = (String, Result<LevelReport, LevelscopeError>);

/// Runs detection for every instrument on the rayon pool.
///
/// Invalid parameters fail the whole call before anything is fetched.
/// Otherwise results come back in input order, one per instrument; a failed
/// fetch is reported against its instrument and does not stop the others.
pub fn analyze_levels(
    data_port: &(dyn DataPort + Sync),
    cache: Option<&dyn LevelCache>,
    instruments: &[String],
    window: Option<DateRange>,
    params: &DetectParams,
) -> Result<Vec<LevelOutcome>, LevelscopeError> {
    params.validate()?;

    Ok(instruments
        .par_iter()
        .map(|instrument| {
            let result = analyze_one(data_port, cache, instrument, window, params);
            (instrument.clone(), result)
        })
        .collect())
}

fn analyze_one(
    data_port: &(dyn DataPort + Sync),
    cache: Option<&dyn LevelCache>,
    instrument: &str,
    window: Option<DateRange>,
    params: &DetectParams,
) -> Result<LevelReport, LevelscopeError> {
    let key = LevelCacheKey::new(instrument, window, params);
    if let Some(hit) = cache.and_then(|c| c.get(&key)) {
        log::debug!("level cache hit for {instrument}");
        return Ok(hit);
    }

    let series = data_port.fetch_series(instrument, window)?;
    let report = levels::detect_with(&series, params)?;
    log::info!(
        "{}: {} bars, {} bands",
        instrument,
        series.len(),
        report.bands.len()
    );

    if let Some(c) = cache {
        c.put(key, report.clone());
    }
    Ok(report)
}

fn fetch_all(
    data_port: &dyn DataPort,
    instruments: &[String],
) -> Result<BTreeMap<String, PriceSeries>, LevelscopeError> {
    let mut series = BTreeMap::new();
    for instrument in instruments {
        series.insert(instrument.clone(), data_port.fetch_series(instrument, None)?);
    }
    Ok(series)
}

/// The explicit window, or else the span every series covers.
///
/// Disjoint histories have no default span and fail as `DataUnavailable`
/// against `label`.
pub fn overlap_window(
    label: &str,
    series: &[&PriceSeries],
    window: Option<DateRange>,
) -> Result<DateRange, LevelscopeError> {
    if let Some(range) = window {
        return Ok(range);
    }
    match timeline::overlap_range(series) {
        Some(range) => {
            log::debug!("{label}: defaulting to overlap {} to {}", range.start, range.end);
            Ok(range)
        }
        None => {
            log::warn!("{label}: date ranges do not overlap");
            Err(LevelscopeError::data_unavailable(label, "no overlapping dates"))
        }
    }
}

/// Fetches full histories and rebases them inside `window`, or inside the
/// overlap of all histories when no window is given.
pub fn compare(
    data_port: &dyn DataPort,
    instruments: &[String],
    window: Option<DateRange>,
) -> Result<Normalization, LevelscopeError> {
    let series = fetch_all(data_port, instruments)?;
    let all: Vec<&PriceSeries> = series.values().collect();
    let range = overlap_window(&instruments.join(","), &all, window)?;
    normalize::normalize(&series, Some(range))
}

pub fn ratio(
    data_port: &dyn DataPort,
    numerator: &str,
    denominator: &str,
    window: Option<DateRange>,
) -> Result<RatioSeries, LevelscopeError> {
    let a = data_port.fetch_series(numerator, None)?;
    let b = data_port.fetch_series(denominator, None)?;
    let label = format!("{numerator}/{denominator}");
    let range = overlap_window(&label, &[&a, &b], window)?;

    let bars = ratio::ratio_series(&a, &b, Some(range))?;
    let common_dates = timeline::common_dates(&[
        &timeline::filter_by_date(&a, range),
        &timeline::filter_by_date(&b, range),
    ])
    .len();
    if bars.is_empty() {
        log::warn!("{label}: no overlapping dates");
    }
    Ok(RatioSeries {
        numerator: numerator.to_string(),
        denominator: denominator.to_string(),
        common_dates,
        bars,
    })
}

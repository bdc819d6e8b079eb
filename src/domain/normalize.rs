//! Rebasing of several instruments onto a common percentage scale.
//!
//! Every instrument is aligned on the union of all instruments' dates,
//! forward-filling missing closes, and expressed as `(close - c0) / c0`
//! where `c0` is its first real close in range. The first point of each
//! instrument is therefore exactly zero.

use crate::domain::error::LevelscopeError;
use crate::domain::ohlcv::{DateRange, PriceSeries};
use crate::domain::timeline;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPoint {
    pub date: NaiveDate,
    pub instrument: String,
    /// Fractional change from the first close (0.05 is +5%).
    pub pct_change: f64,
    pub close: f64,
    pub filled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    NoObservations,
    NonPositiveBase { close: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pub instrument: String,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Normalization {
    pub points: Vec<NormalizedPoint>,
    pub excluded: Vec<Exclusion>,
}

impl Normalization {
    pub fn for_instrument<'a>(
        &'a self,
        instrument: &'a str,
    ) -> impl Iterator<Item = &'a NormalizedPoint> + 'a {
        self.points.iter().filter(move |p| p.instrument == instrument)
    }
}

pub fn normalize(
    series_by_instrument: &BTreeMap<String, PriceSeries>,
    date_range: Option<DateRange>,
) -> Result<Normalization, LevelscopeError> {
    if let Some(range) = date_range {
        DateRange::new(range.start, range.end)?;
    }

    let mut excluded = Vec::new();
    let mut in_range: Vec<(&str, PriceSeries)> = Vec::with_capacity(series_by_instrument.len());

    for (instrument, series) in series_by_instrument {
        let restricted = match date_range {
            Some(range) => timeline::filter_by_date(series, range),
            None => series.clone(),
        };
        let Some(first) = restricted.bars().first() else {
            log::warn!("excluding {instrument} from comparison: no observations in range");
            excluded.push(Exclusion {
                instrument: instrument.clone(),
                reason: ExclusionReason::NoObservations,
            });
            continue;
        };
        if first.close <= 0.0 || !first.close.is_finite() {
            log::warn!(
                "excluding {instrument} from comparison: base close {} cannot be rebased",
                first.close
            );
            excluded.push(Exclusion {
                instrument: instrument.clone(),
                reason: ExclusionReason::NonPositiveBase { close: first.close },
            });
            continue;
        }
        in_range.push((instrument.as_str(), restricted));
    }

    let all: Vec<&PriceSeries> = in_range.iter().map(|(_, s)| s).collect();
    let dates = timeline::unified_timeline(&all);

    let mut points = Vec::new();
    for (instrument, series) in &in_range {
        let aligned = timeline::align_to_timeline(series, &dates);
        let Some(base) = aligned.first().map(|a| a.bar.close) else {
            continue;
        };
        points.extend(aligned.into_iter().map(|a| NormalizedPoint {
            date: a.bar.date,
            instrument: instrument.to_string(),
            pct_change: (a.bar.close - base) / base,
            close: a.bar.close,
            filled: a.filled,
        }));
    }

    log::debug!(
        "normalized {} instruments over {} dates ({} excluded)",
        in_range.len(),
        dates.len(),
        excluded.len()
    );

    Ok(Normalization { points, excluded })
}

//! Date filtering and cross-series alignment.

use crate::domain::ohlcv::{DateRange, OhlcvBar, PriceSeries};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// A bar placed on a shared timeline. `filled` bars repeat the last real close.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBar {
    pub bar: OhlcvBar,
    pub filled: bool,
}

pub fn filter_by_date(series: &PriceSeries, range: DateRange) -> PriceSeries {
    let bars = series.bars();
    let start = bars.partition_point(|b| b.date < range.start);
    let end = bars.partition_point(|b| b.date <= range.end);
    PriceSeries::from_slice(&bars[start..end.max(start)])
}

/// The last `n` bars (all of them when the series is shorter).
pub fn tail(series: &PriceSeries, n: usize) -> PriceSeries {
    let bars = series.bars();
    PriceSeries::from_slice(&bars[bars.len().saturating_sub(n)..])
}

pub fn unified_timeline(series: &[&PriceSeries]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series.iter().flat_map(|s| s.dates()).collect();
    unique_dates.into_iter().collect()
}

pub fn common_dates(series: &[&PriceSeries]) -> Vec<NaiveDate> {
    let Some((first, rest)) = series.split_first() else {
        return Vec::new();
    };
    first
        .dates()
        .filter(|d| rest.iter().all(|s| s.get(*d).is_some()))
        .collect()
}

/// Latest first date to earliest last date; `None` when any series is empty
/// or the spans do not overlap.
pub fn overlap_range(series: &[&PriceSeries]) -> Option<DateRange> {
    if series.is_empty() {
        return None;
    }
    let mut start = NaiveDate::MIN;
    let mut end = NaiveDate::MAX;
    for s in series {
        start = start.max(s.first_date()?);
        end = end.min(s.last_date()?);
    }
    DateRange::new(start, end).ok()
}

/// Forward-fills `series` onto `timeline`.
///
/// Output starts at the series' first real bar; earlier timeline dates are
/// skipped, never back-filled. Gaps carry the previous close into all four
/// price fields with zero volume.
pub fn align_to_timeline(series: &PriceSeries, timeline: &[NaiveDate]) -> Vec<AlignedBar> {
    let bars = series.bars();
    let mut aligned = Vec::with_capacity(timeline.len());
    let mut next = 0;
    let mut last: Option<&OhlcvBar> = None;

    for &date in timeline {
        while next < bars.len() && bars[next].date < date {
            // Bars absent from the timeline still advance the carried close.
            last = Some(&bars[next]);
            next += 1;
        }
        if next < bars.len() && bars[next].date == date {
            last = Some(&bars[next]);
            next += 1;
            aligned.push(AlignedBar {
                bar: bars[next - 1].clone(),
                filled: false,
            });
        } else if let Some(prev) = last {
            aligned.push(AlignedBar {
                bar: OhlcvBar {
                    date,
                    open: prev.close,
                    high: prev.close,
                    low: prev.close,
                    close: prev.close,
                    volume: 0,
                },
                filled: true,
            });
        }
    }

    aligned
}

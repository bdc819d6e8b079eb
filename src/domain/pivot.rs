//! Local extrema ("pivots") over the high and low series.
//!
//! A bar at index `i` is a pivot high when its high is strictly above every
//! other high in `[i - order, i + order]`; pivot lows mirror this on lows.
//! Bars within `order` of either end are never pivots.

use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotKind {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pivot {
    pub date: NaiveDate,
    pub price: f64,
    pub kind: PivotKind,
    pub index: usize,
}

impl Pivot {
    fn from_bar(bars: &[OhlcvBar], index: usize, kind: PivotKind) -> Self {
        let bar = &bars[index];
        let price = match kind {
            PivotKind::High => bar.high,
            PivotKind::Low => bar.low,
        };
        Pivot {
            date: bar.date,
            price,
            kind,
            index,
        }
    }
}

/// Minimum series length for which any index has a full neighbourhood.
pub fn required_bars(order: usize) -> usize {
    2 * order + 1
}

pub fn is_pivot_high(bars: &[OhlcvBar], i: usize, order: usize) -> bool {
    if order == 0 || i < order || i + order >= bars.len() {
        return false;
    }
    let hi = bars[i].high;
    bars[i - order..i].iter().all(|b| b.high < hi)
        && bars[i + 1..=i + order].iter().all(|b| b.high < hi)
}

pub fn is_pivot_low(bars: &[OhlcvBar], i: usize, order: usize) -> bool {
    if order == 0 || i < order || i + order >= bars.len() {
        return false;
    }
    let lo = bars[i].low;
    bars[i - order..i].iter().all(|b| b.low > lo)
        && bars[i + 1..=i + order].iter().all(|b| b.low > lo)
}

/// All pivots in index order, highs and lows interleaved.
pub fn find_pivots(series: &PriceSeries, order: usize) -> Vec<Pivot> {
    let bars = series.bars();
    if order == 0 || bars.len() < required_bars(order) {
        return Vec::new();
    }

    let mut pivots = Vec::new();
    for i in order..bars.len() - order {
        if is_pivot_high(bars, i, order) {
            pivots.push(Pivot::from_bar(bars, i, PivotKind::High));
        }
        if is_pivot_low(bars, i, order) {
            pivots.push(Pivot::from_bar(bars, i, PivotKind::Low));
        }
    }
    pivots
}

/// The `count` highest highs and `count` lowest lows, ties to the earlier bar.
///
/// These are not local extrema; they stand in for them when levels are
/// derived from absolute price extremes.
pub fn extreme_pivots(series: &PriceSeries, count: usize) -> Vec<Pivot> {
    let bars = series.bars();
    let mut by_high: Vec<usize> = (0..bars.len()).collect();
    by_high.sort_by(|&a, &b| {
        bars[b]
            .high
            .total_cmp(&bars[a].high)
            .then_with(|| a.cmp(&b))
    });
    let mut by_low: Vec<usize> = (0..bars.len()).collect();
    by_low.sort_by(|&a, &b| bars[a].low.total_cmp(&bars[b].low).then_with(|| a.cmp(&b)));

    let mut pivots: Vec<Pivot> = by_high
        .into_iter()
        .take(count)
        .map(|i| Pivot::from_bar(bars, i, PivotKind::High))
        .chain(
            by_low
                .into_iter()
                .take(count)
                .map(|i| Pivot::from_bar(bars, i, PivotKind::Low)),
        )
        .collect();
    pivots.sort_by(index_order);
    pivots
}

/// Orders by index, highs before lows on the same bar.
pub(crate) fn index_order(a: &Pivot, b: &Pivot) -> Ordering {
    let rank = |k: PivotKind| match k {
        PivotKind::High => 0,
        PivotKind::Low => 1,
    };
    a.index
        .cmp(&b.index)
        .then_with(|| rank(a.kind).cmp(&rank(b.kind)))
}

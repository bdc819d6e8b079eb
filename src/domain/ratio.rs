//! Relative-strength OHLC series of one instrument against another.
//!
//! Both series are forward-filled onto their unified timeline and divided
//! bar by bar. High and low cross over (`a.high / b.low`, `a.low / b.high`)
//! so each ratio bar spans the widest range the two bars allow.

use crate::domain::error::LevelscopeError;
use crate::domain::ohlcv::{DateRange, PriceSeries};
use crate::domain::timeline::{self, AlignedBar};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl RatioBar {
    fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioSeries {
    pub numerator: String,
    pub denominator: String,
    /// Dates both instruments actually traded, before forward fill.
    pub common_dates: usize,
    pub bars: Vec<RatioBar>,
}

pub fn ratio_series(
    numerator: &PriceSeries,
    denominator: &PriceSeries,
    date_range: Option<DateRange>,
) -> Result<Vec<RatioBar>, LevelscopeError> {
    let (a, b) = match date_range {
        Some(range) => {
            let range = DateRange::new(range.start, range.end)?;
            (
                timeline::filter_by_date(numerator, range),
                timeline::filter_by_date(denominator, range),
            )
        }
        None => (numerator.clone(), denominator.clone()),
    };

    let dates = timeline::unified_timeline(&[&a, &b]);
    let a_aligned = timeline::align_to_timeline(&a, &dates);
    let b_aligned = timeline::align_to_timeline(&b, &dates);

    let mut bars = Vec::new();
    let mut j = 0;
    for x in &a_aligned {
        while j < b_aligned.len() && b_aligned[j].bar.date < x.bar.date {
            j += 1;
        }
        if let Some(y) = b_aligned.get(j).filter(|y| y.bar.date == x.bar.date) {
            let bar = divide(x, y);
            if bar.is_finite() {
                bars.push(bar);
            }
        }
    }
    Ok(bars)
}

fn divide(a: &AlignedBar, b: &AlignedBar) -> RatioBar {
    RatioBar {
        date: a.bar.date,
        open: a.bar.open / b.bar.open,
        high: a.bar.high / b.bar.low,
        low: a.bar.low / b.bar.high,
        close: a.bar.close / b.bar.close,
    }
}

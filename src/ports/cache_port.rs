//! Level result cache port.
//!
//! Detection is pure, so a report can be reused whenever the instrument, the
//! date window and every parameter match. The cache sits outside the domain;
//! callers decide when entries go stale.

use crate::domain::levels::{DetectParams, LevelMethod, LevelReport};
use crate::domain::ohlcv::DateRange;

/// Hashable image of [`DetectParams`]; the tolerance is keyed by its bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamsKey {
    order: usize,
    tolerance_bits: u64,
    min_touches: usize,
    method: LevelMethod,
    lookback: Option<usize>,
    max_levels: Option<usize>,
}

impl From<&DetectParams> for ParamsKey {
    fn from(params: &DetectParams) -> Self {
        Self {
            order: params.order,
            tolerance_bits: params.tolerance_pct.to_bits(),
            min_touches: params.min_touches,
            method: params.method,
            lookback: params.lookback,
            max_levels: params.max_levels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelCacheKey {
    pub instrument: String,
    pub window: Option<DateRange>,
    pub params: ParamsKey,
}

impl LevelCacheKey {
    pub fn new(instrument: &str, window: Option<DateRange>, params: &DetectParams) -> Self {
        Self {
            instrument: instrument.to_string(),
            window,
            params: ParamsKey::from(params),
        }
    }
}

pub trait LevelCache: Send + Sync {
    fn get(&self, key: &LevelCacheKey) -> Option<LevelReport>;
    fn put(&self, key: LevelCacheKey, report: LevelReport);
    /// Drops every entry for `instrument`, e.g. after its data was refreshed.
    fn invalidate(&self, instrument: &str);
    fn clear(&self);
}

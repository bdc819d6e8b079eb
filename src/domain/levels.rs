//! Support/resistance level detection.
//!
//! Pivots of one kind are clustered into [`LevelBand`]s by a single greedy
//! pass in ascending price order. A pivot joins the open band when it lies
//! within `tolerance_pct` percent of the band's running mean, otherwise it
//! seeds a new band. This is an approximation of interval clustering: each
//! absorption is checked against the mean at that moment, so a band's members
//! can spread wider than `tolerance_pct` around its first seed or its final
//! center.

use crate::domain::error::LevelscopeError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::pivot::{self, Pivot, PivotKind};
use crate::domain::timeline;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ORDER: usize = 5;
pub const DEFAULT_TOLERANCE_PCT: f64 = 1.0;
pub const DEFAULT_MIN_TOUCHES: usize = 2;
pub const DEFAULT_MAX_LEVELS: usize = 5;
/// Extreme candidates gathered per level requested.
pub const EXTREMES_PER_LEVEL: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandKind {
    Support,
    Resistance,
}

impl BandKind {
    pub fn pivot_kind(self) -> PivotKind {
        match self {
            BandKind::Support => PivotKind::Low,
            BandKind::Resistance => PivotKind::High,
        }
    }

    fn from_pivot_kind(kind: PivotKind) -> Self {
        match kind {
            PivotKind::Low => BandKind::Support,
            PivotKind::High => BandKind::Resistance,
        }
    }
}

impl fmt::Display for BandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandKind::Support => write!(f, "support"),
            BandKind::Resistance => write!(f, "resistance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelBand {
    pub center_price: f64,
    pub kind: BandKind,
    /// Absorption order: ascending price, earlier date first on ties.
    pub member_pivots: Vec<Pivot>,
    pub touch_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub lower: f64,
    pub upper: f64,
}

impl LevelBand {
    fn from_members(kind: BandKind, members: Vec<Pivot>, center_price: f64) -> Self {
        let first_date = members.iter().map(|p| p.date).min().unwrap_or(NaiveDate::MIN);
        let last_date = members.iter().map(|p| p.date).max().unwrap_or(NaiveDate::MIN);
        // members are price-sorted
        let lower = members.first().map(|p| p.price).unwrap_or(center_price);
        let upper = members.last().map(|p| p.price).unwrap_or(center_price);
        LevelBand {
            center_price,
            kind,
            touch_count: members.len(),
            member_pivots: members,
            first_date,
            last_date,
            lower,
            upper,
        }
    }
}

/// Whether detection actually ran over the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DetectionStatus {
    Evaluated { bars: usize, pivots: usize },
    InsufficientData { bars: usize, required: usize },
}

impl DetectionStatus {
    pub fn bars(&self) -> usize {
        match *self {
            DetectionStatus::Evaluated { bars, .. } | DetectionStatus::InsufficientData { bars, .. } => bars,
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStatus::Evaluated { .. } => write!(f, "evaluated"),
            DetectionStatus::InsufficientData { .. } => write!(f, "insufficient_data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub status: DetectionStatus,
    pub bands: Vec<LevelBand>,
}

impl LevelReport {
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn supports(&self) -> impl Iterator<Item = &LevelBand> {
        self.bands.iter().filter(|b| b.kind == BandKind::Support)
    }

    pub fn resistances(&self) -> impl Iterator<Item = &LevelBand> {
        self.bands.iter().filter(|b| b.kind == BandKind::Resistance)
    }
}

/// Per-instrument detection result handed to report writers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentLevels {
    pub instrument: String,
    #[serde(flatten)]
    pub report: LevelReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelMethod {
    /// Local extrema only.
    Pivots,
    /// Absolute highest highs / lowest lows.
    Extremes,
    Combined,
}

impl FromStr for LevelMethod {
    type Err = LevelscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pivots" => Ok(LevelMethod::Pivots),
            "extremes" => Ok(LevelMethod::Extremes),
            "combined" => Ok(LevelMethod::Combined),
            other => Err(LevelscopeError::invalid_argument(
                "method",
                format!("unknown level method '{other}' (expected pivots, extremes or combined)"),
            )),
        }
    }
}

impl fmt::Display for LevelMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelMethod::Pivots => write!(f, "pivots"),
            LevelMethod::Extremes => write!(f, "extremes"),
            LevelMethod::Combined => write!(f, "combined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectParams {
    pub order: usize,
    pub tolerance_pct: f64,
    pub min_touches: usize,
    pub method: LevelMethod,
    pub lookback: Option<usize>,
    pub max_levels: Option<usize>,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
            min_touches: DEFAULT_MIN_TOUCHES,
            method: LevelMethod::Pivots,
            lookback: None,
            max_levels: None,
        }
    }
}

impl DetectParams {
    pub fn validate(&self) -> Result<(), LevelscopeError> {
        validate_core(self.order, self.tolerance_pct, self.min_touches)?;
        if self.lookback == Some(0) {
            return Err(LevelscopeError::invalid_argument(
                "lookback",
                "must be positive",
            ));
        }
        if self.max_levels == Some(0) {
            return Err(LevelscopeError::invalid_argument(
                "max_levels",
                "must be positive",
            ));
        }
        Ok(())
    }
}

fn validate_core(order: usize, tolerance_pct: f64, min_touches: usize) -> Result<(), LevelscopeError> {
    if order == 0 {
        return Err(LevelscopeError::invalid_argument("order", "must be positive"));
    }
    if !tolerance_pct.is_finite() || tolerance_pct <= 0.0 {
        return Err(LevelscopeError::invalid_argument(
            "tolerance_pct",
            format!("must be a positive number, got {tolerance_pct}"),
        ));
    }
    if min_touches == 0 {
        return Err(LevelscopeError::invalid_argument(
            "min_touches",
            "must be positive",
        ));
    }
    Ok(())
}

/// Detects local-extrema support/resistance bands.
///
/// Series shorter than `2 * order + 1` produce no bands and an
/// [`DetectionStatus::InsufficientData`] status rather than an error.
pub fn detect(
    series: &PriceSeries,
    order: usize,
    tolerance_pct: f64,
    min_touches: usize,
) -> Result<LevelReport, LevelscopeError> {
    validate_core(order, tolerance_pct, min_touches)?;

    let required = pivot::required_bars(order);
    if series.len() < required {
        return Ok(LevelReport {
            status: DetectionStatus::InsufficientData {
                bars: series.len(),
                required,
            },
            bands: Vec::new(),
        });
    }

    let pivots = pivot::find_pivots(series, order);
    Ok(LevelReport {
        status: DetectionStatus::Evaluated {
            bars: series.len(),
            pivots: pivots.len(),
        },
        bands: cluster_and_filter(&pivots, tolerance_pct, min_touches),
    })
}

/// [`detect`] with lookback, candidate method and per-side level cap.
pub fn detect_with(series: &PriceSeries, params: &DetectParams) -> Result<LevelReport, LevelscopeError> {
    params.validate()?;

    let window;
    let series = match params.lookback {
        Some(n) => {
            window = timeline::tail(series, n);
            &window
        }
        None => series,
    };

    let mut report = match params.method {
        LevelMethod::Pivots => detect(series, params.order, params.tolerance_pct, params.min_touches)?,
        LevelMethod::Extremes | LevelMethod::Combined if series.is_empty() => LevelReport {
            status: DetectionStatus::InsufficientData { bars: 0, required: 1 },
            bands: Vec::new(),
        },
        LevelMethod::Extremes | LevelMethod::Combined => {
            let count = params.max_levels.unwrap_or(DEFAULT_MAX_LEVELS) * EXTREMES_PER_LEVEL;
            let mut candidates = pivot::extreme_pivots(series, count);
            if params.method == LevelMethod::Combined {
                candidates.extend(pivot::find_pivots(series, params.order));
                candidates.sort_by(pivot::index_order);
                let mut seen = HashSet::new();
                candidates.retain(|p| seen.insert((p.kind, p.index)));
            }
            LevelReport {
                status: DetectionStatus::Evaluated {
                    bars: series.len(),
                    pivots: candidates.len(),
                },
                bands: cluster_and_filter(&candidates, params.tolerance_pct, params.min_touches),
            }
        }
    };

    if let Some(limit) = params.max_levels {
        let mut kept = rank_bands(&report.bands, BandKind::Support, limit);
        kept.extend(rank_bands(&report.bands, BandKind::Resistance, limit));
        sort_for_output(&mut kept);
        report.bands = kept;
    }

    log::debug!(
        "detected {} bands ({} method, status {:?})",
        report.bands.len(),
        params.method,
        report.status
    );
    Ok(report)
}

fn cluster_and_filter(pivots: &[Pivot], tolerance_pct: f64, min_touches: usize) -> Vec<LevelBand> {
    let mut bands = Vec::new();
    for kind in [BandKind::Support, BandKind::Resistance] {
        let same_kind: Vec<Pivot> = pivots
            .iter()
            .filter(|p| p.kind == kind.pivot_kind())
            .cloned()
            .collect();
        bands.extend(
            cluster_pivots(same_kind, tolerance_pct)
                .into_iter()
                .filter(|b| b.touch_count >= min_touches),
        );
    }
    sort_for_output(&mut bands);
    bands
}

/// Greedy single-pass clustering of same-kind pivots.
///
/// Mixed kinds are split so no band ever holds both highs and lows.
/// Output holds support bands then resistance bands, each by center ascending.
pub fn cluster_pivots(mut pivots: Vec<Pivot>, tolerance_pct: f64) -> Vec<LevelBand> {
    pivots.sort_by(|a, b| {
        pivot_kind_rank(a.kind)
            .cmp(&pivot_kind_rank(b.kind))
            .then_with(|| a.price.total_cmp(&b.price))
            .then_with(|| a.date.cmp(&b.date))
            .then_with(|| a.index.cmp(&b.index))
    });

    let mut bands = Vec::new();
    let mut members: Vec<Pivot> = Vec::new();
    let mut sum = 0.0;

    for p in pivots {
        if let Some(seed) = members.first() {
            let center = sum / members.len() as f64;
            if seed.kind == p.kind && within_tolerance(p.price, center, tolerance_pct) {
                sum += p.price;
                members.push(p);
                continue;
            }
            let kind = BandKind::from_pivot_kind(seed.kind);
            let closed = std::mem::take(&mut members);
            bands.push(LevelBand::from_members(kind, closed, center));
        }
        sum = p.price;
        members.push(p);
    }
    if let Some(seed) = members.first() {
        let center = sum / members.len() as f64;
        bands.push(LevelBand::from_members(
            BandKind::from_pivot_kind(seed.kind),
            members,
            center,
        ));
    }

    bands
}

/// `|price - center|` no larger than `tolerance_pct` percent of `center`.
pub fn within_tolerance(price: f64, center: f64, tolerance_pct: f64) -> bool {
    (price - center).abs() <= center.abs() * tolerance_pct / 100.0
}

/// The `limit` strongest bands of one kind.
///
/// Strength: more touches first, then the most recent touch, then lower
/// center price.
pub fn rank_bands(bands: &[LevelBand], kind: BandKind, limit: usize) -> Vec<LevelBand> {
    let mut ranked: Vec<LevelBand> = bands.iter().filter(|b| b.kind == kind).cloned().collect();
    ranked.sort_by(|a, b| {
        b.touch_count
            .cmp(&a.touch_count)
            .then_with(|| b.last_date.cmp(&a.last_date))
            .then_with(|| a.center_price.total_cmp(&b.center_price))
    });
    ranked.truncate(limit);
    ranked
}

fn pivot_kind_rank(kind: PivotKind) -> u8 {
    match kind {
        PivotKind::Low => 0,
        PivotKind::High => 1,
    }
}

/// Supports before resistances, each by center ascending.
fn sort_for_output(bands: &mut [LevelBand]) {
    bands.sort_by(|a, b| {
        let kind_order = match (a.kind, b.kind) {
            (BandKind::Support, BandKind::Resistance) => Ordering::Less,
            (BandKind::Resistance, BandKind::Support) => Ordering::Greater,
            _ => Ordering::Equal,
        };
        kind_order.then_with(|| a.center_price.total_cmp(&b.center_price))
    });
}

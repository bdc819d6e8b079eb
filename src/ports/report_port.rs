//! Result writer port trait.

use crate::domain::error::LevelscopeError;
use crate::domain::levels::InstrumentLevels;
use crate::domain::normalize::Normalization;
use crate::domain::ratio::RatioSeries;
use std::path::Path;

/// Port for handing analysis results to the presentation layer.
pub trait ReportPort {
    fn write_levels(
        &self,
        levels: &[InstrumentLevels],
        output_path: &Path,
    ) -> Result<(), LevelscopeError>;

    fn write_comparison(
        &self,
        comparison: &Normalization,
        output_path: &Path,
    ) -> Result<(), LevelscopeError>;

    fn write_ratio(&self, ratio: &RatioSeries, output_path: &Path)
        -> Result<(), LevelscopeError>;
}

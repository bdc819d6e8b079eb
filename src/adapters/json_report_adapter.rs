//! JSON report writer.

use crate::domain::error::LevelscopeError;
use crate::domain::levels::InstrumentLevels;
use crate::domain::normalize::Normalization;
use crate::domain::ratio::RatioSeries;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn to_string<T: Serialize>(value: &T) -> Result<String, LevelscopeError> {
        serde_json::to_string_pretty(value).map_err(|e| LevelscopeError::Report {
            reason: e.to_string(),
        })
    }

    fn write_json<T: Serialize>(value: &T, output_path: &Path) -> Result<(), LevelscopeError> {
        let file = File::create(output_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|e| LevelscopeError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_levels(
        &self,
        levels: &[InstrumentLevels],
        output_path: &Path,
    ) -> Result<(), LevelscopeError> {
        Self::write_json(&levels, output_path)
    }

    fn write_comparison(
        &self,
        comparison: &Normalization,
        output_path: &Path,
    ) -> Result<(), LevelscopeError> {
        Self::write_json(comparison, output_path)
    }

    fn write_ratio(&self, ratio: &RatioSeries, output_path: &Path) -> Result<(), LevelscopeError> {
        Self::write_json(ratio, output_path)
    }
}

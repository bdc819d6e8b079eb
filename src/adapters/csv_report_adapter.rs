//! CSV report writer: one row per band, normalized point or ratio bar.
//!
//! Level reports carry the detection status on every row, and an instrument
//! without bands still gets one row with the band columns left empty.

use crate::domain::error::LevelscopeError;
use crate::domain::levels::InstrumentLevels;
use crate::domain::normalize::Normalization;
use crate::domain::ratio::RatioSeries;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

fn csv_error(e: csv::Error) -> LevelscopeError {
    LevelscopeError::Report {
        reason: format!("CSV write error: {}", e),
    }
}

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn levels_to_writer<W: Write>(
        levels: &[InstrumentLevels],
        out: W,
    ) -> Result<(), LevelscopeError> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record([
            "instrument",
            "status",
            "bars",
            "kind",
            "center_price",
            "lower",
            "upper",
            "touch_count",
            "first_date",
            "last_date",
        ])
        .map_err(csv_error)?;
        for entry in levels {
            let status = entry.report.status.to_string();
            let bars = entry.report.status.bars().to_string();
            if entry.report.bands.is_empty() {
                let mut row = vec![entry.instrument.clone(), status, bars];
                row.resize(10, String::new());
                wtr.write_record(&row).map_err(csv_error)?;
                continue;
            }
            for band in &entry.report.bands {
                wtr.write_record([
                    entry.instrument.clone(),
                    status.clone(),
                    bars.clone(),
                    band.kind.to_string(),
                    format!("{:.4}", band.center_price),
                    format!("{:.4}", band.lower),
                    format!("{:.4}", band.upper),
                    band.touch_count.to_string(),
                    band.first_date.to_string(),
                    band.last_date.to_string(),
                ])
                .map_err(csv_error)?;
            }
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn comparison_to_writer<W: Write>(
        comparison: &Normalization,
        out: W,
    ) -> Result<(), LevelscopeError> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(["date", "instrument", "close", "pct_change", "filled"])
            .map_err(csv_error)?;
        for p in &comparison.points {
            wtr.write_record([
                p.date.to_string(),
                p.instrument.clone(),
                p.close.to_string(),
                p.pct_change.to_string(),
                p.filled.to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn ratio_to_writer<W: Write>(ratio: &RatioSeries, out: W) -> Result<(), LevelscopeError> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(["date", "open", "high", "low", "close"])
            .map_err(csv_error)?;
        for bar in &ratio.bars {
            wtr.write_record([
                bar.date.to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_levels(
        &self,
        levels: &[InstrumentLevels],
        output_path: &Path,
    ) -> Result<(), LevelscopeError> {
        Self::levels_to_writer(levels, std::fs::File::create(output_path)?)
    }

    fn write_comparison(
        &self,
        comparison: &Normalization,
        output_path: &Path,
    ) -> Result<(), LevelscopeError> {
        Self::comparison_to_writer(comparison, std::fs::File::create(output_path)?)
    }

    fn write_ratio(&self, ratio: &RatioSeries, output_path: &Path) -> Result<(), LevelscopeError> {
        Self::ratio_to_writer(ratio, std::fs::File::create(output_path)?)
    }
}

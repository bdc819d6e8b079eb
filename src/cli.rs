//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::memory_cache::InMemoryLevelCache;
use crate::domain::config_validation::{
    validate_compare_config, validate_data_config, validate_levels_config,
};
use crate::domain::error::LevelscopeError;
use crate::domain::levels::{
    DetectParams, DetectionStatus, InstrumentLevels, LevelMethod, DEFAULT_MIN_TOUCHES,
    DEFAULT_ORDER, DEFAULT_TOLERANCE_PCT,
};
use crate::domain::normalize::{ExclusionReason, Normalization};
use crate::domain::ohlcv::DateRange;
use crate::domain::ratio::RatioSeries;
use crate::domain::universe::parse_instruments;
use crate::pipeline;
use crate::ports::cache_port::LevelCache;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "levelscope",
    about = "Support/resistance levels and relative performance for OHLCV series"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect support/resistance bands
    Levels {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated instruments; overrides [levels] instruments
        #[arg(short, long)]
        instrument: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },
    /// Rebase several instruments to percentage change from their first close
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        instruments: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },
    /// Build a numerator/denominator ratio series
    Ratio {
        #[arg(short, long)]
        config: PathBuf,
        numerator: String,
        denominator: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },
    /// List instruments available in the data source
    List {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for instrument(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        instrument: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Levels {
            config,
            instrument,
            start,
            end,
            output,
            format,
        } => run_levels(&config, instrument.as_deref(), start, end, output.as_ref(), format),
        Command::Compare {
            config,
            instruments,
            start,
            end,
            output,
            format,
        } => run_compare(&config, instruments.as_deref(), start, end, output.as_ref(), format),
        Command::Ratio {
            config,
            numerator,
            denominator,
            start,
            end,
            output,
            format,
        } => run_ratio(
            &config,
            &numerator,
            &denominator,
            start,
            end,
            output.as_ref(),
            format,
        ),
        Command::List { config } => run_list(&config),
        Command::Info { config, instrument } => run_info(&config, instrument.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: LevelscopeError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

fn positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, LevelscopeError> {
    let Some(raw) = config.get_trimmed(section, key) else {
        return Ok(None);
    };
    match raw.parse::<usize>() {
        Ok(v) if v > 0 => Ok(Some(v)),
        _ => Err(LevelscopeError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason: format!("{key} must be a positive integer, got '{raw}'"),
        }),
    }
}

/// Reads `[levels]`; `method` defaults to `combined` here.
pub fn build_detect_params(config: &dyn ConfigPort) -> Result<DetectParams, LevelscopeError> {
    let method = match config.get_trimmed("levels", "method") {
        Some(raw) => raw
            .parse::<LevelMethod>()
            .map_err(|e| LevelscopeError::ConfigInvalid {
                section: "levels".into(),
                key: "method".into(),
                reason: e.to_string(),
            })?,
        None => LevelMethod::Combined,
    };

    let params = DetectParams {
        order: positive(config, "levels", "order")?.unwrap_or(DEFAULT_ORDER),
        tolerance_pct: config.get_double("levels", "tolerance_pct", DEFAULT_TOLERANCE_PCT),
        min_touches: positive(config, "levels", "min_touches")?.unwrap_or(DEFAULT_MIN_TOUCHES),
        method,
        lookback: positive(config, "levels", "lookback")?,
        max_levels: positive(config, "levels", "max_levels")?,
    };
    params.validate()?;
    Ok(params)
}

fn config_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, LevelscopeError> {
    match config.get_date(section, key) {
        None => Ok(None),
        Some(Ok(d)) => Ok(Some(d)),
        Some(Err(raw)) => Err(LevelscopeError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason: format!("invalid date '{raw}' (expected YYYY-MM-DD)"),
        }),
    }
}

/// Command-line dates override `[section] start_date/end_date`.
///
/// A single bound leaves the other side open; no bound at all means the
/// full history.
pub fn build_window(
    config: &dyn ConfigPort,
    section: &str,
    start_override: Option<NaiveDate>,
    end_override: Option<NaiveDate>,
) -> Result<Option<DateRange>, LevelscopeError> {
    let start = match start_override {
        Some(d) => Some(d),
        None => config_date(config, section, "start_date")?,
    };
    let end = match end_override {
        Some(d) => Some(d),
        None => config_date(config, section, "end_date")?,
    };

    match (start, end) {
        (None, None) => Ok(None),
        (start, end) => {
            let open_start = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN);
            let open_end = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX);
            DateRange::new(start.unwrap_or(open_start), end.unwrap_or(open_end)).map(Some)
        }
    }
}

pub fn resolve_instruments(
    instrument_override: Option<&str>,
    config: &dyn ConfigPort,
    section: &str,
) -> Result<Vec<String>, LevelscopeError> {
    if let Some(list) = instrument_override {
        return parse_instruments(list)
            .map_err(|e| LevelscopeError::invalid_argument("instrument", e.to_string()));
    }

    match config.get_string(section, "instruments") {
        Some(list) => parse_instruments(&list).map_err(|e| LevelscopeError::ConfigInvalid {
            section: section.into(),
            key: "instruments".into(),
            reason: e.to_string(),
        }),
        None => Err(LevelscopeError::ConfigMissing {
            section: section.into(),
            key: "instruments".into(),
        }),
    }
}

pub fn open_data_port(
    config: &dyn ConfigPort,
) -> Result<Box<dyn DataPort + Sync>, LevelscopeError> {
    validate_data_config(config)?;
    let source = config
        .get_trimmed("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    if source == "sqlite" {
        #[cfg(feature = "sqlite")]
        {
            use crate::adapters::sqlite_adapter::SqliteAdapter;
            let adapter = SqliteAdapter::from_config(config)?;
            adapter.initialize_schema()?;
            return Ok(Box::new(adapter));
        }

        #[cfg(not(feature = "sqlite"))]
        {
            return Err(LevelscopeError::ConfigInvalid {
                section: "data".into(),
                key: "source".into(),
                reason: "sqlite feature is not enabled".into(),
            });
        }
    }

    let path = config
        .get_trimmed("data", "path")
        .ok_or_else(|| LevelscopeError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;
    Ok(Box::new(CsvAdapter::new(PathBuf::from(path))))
}

fn report_adapter(format: ReportFormat) -> Box<dyn ReportPort> {
    match format {
        ReportFormat::Json => Box::new(JsonReportAdapter::new()),
        ReportFormat::Csv => Box::new(CsvReportAdapter::new()),
    }
}

fn print_stdout(text: &[u8]) -> Result<(), LevelscopeError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text)?;
    stdout.flush()?;
    Ok(())
}

pub fn emit_levels(
    levels: &[InstrumentLevels],
    output: Option<&PathBuf>,
    format: ReportFormat,
) -> Result<(), LevelscopeError> {
    match output {
        Some(path) => {
            report_adapter(format).write_levels(levels, path)?;
            eprintln!("\nReport written to: {}", path.display());
            Ok(())
        }
        None => match format {
            ReportFormat::Json => {
                print_stdout(format!("{}\n", JsonReportAdapter::to_string(&levels)?).as_bytes())
            }
            ReportFormat::Csv => CsvReportAdapter::levels_to_writer(levels, io::stdout().lock()),
        },
    }
}

fn emit_comparison(
    comparison: &Normalization,
    output: Option<&PathBuf>,
    format: ReportFormat,
) -> Result<(), LevelscopeError> {
    match output {
        Some(path) => {
            report_adapter(format).write_comparison(comparison, path)?;
            eprintln!("\nReport written to: {}", path.display());
            Ok(())
        }
        None => match format {
            ReportFormat::Json => print_stdout(
                format!("{}\n", JsonReportAdapter::to_string(comparison)?).as_bytes(),
            ),
            ReportFormat::Csv => {
                CsvReportAdapter::comparison_to_writer(comparison, io::stdout().lock())
            }
        },
    }
}

fn emit_ratio(
    ratio: &RatioSeries,
    output: Option<&PathBuf>,
    format: ReportFormat,
) -> Result<(), LevelscopeError> {
    match output {
        Some(path) => {
            report_adapter(format).write_ratio(ratio, path)?;
            eprintln!("\nReport written to: {}", path.display());
            Ok(())
        }
        None => match format {
            ReportFormat::Json => {
                print_stdout(format!("{}\n", JsonReportAdapter::to_string(ratio)?).as_bytes())
            }
            ReportFormat::Csv => CsvReportAdapter::ratio_to_writer(ratio, io::stdout().lock()),
        },
    }
}

/// Reports that detection produced, plus the instruments that failed.
#[derive(Debug, Default)]
pub struct LevelsRun {
    pub levels: Vec<InstrumentLevels>,
    pub failed: Vec<(String, LevelscopeError)>,
}

/// Detection over a configured data port. Failed instruments are logged and
/// kept aside so the caller can report them.
pub fn run_levels_pipeline(
    data_port: &(dyn DataPort + Sync),
    cache: Option<&dyn LevelCache>,
    instruments: &[String],
    window: Option<DateRange>,
    params: &DetectParams,
) -> Result<LevelsRun, LevelscopeError> {
    let outcomes = pipeline::analyze_levels(data_port, cache, instruments, window, params)?;

    let mut run = LevelsRun::default();
    for (instrument, outcome) in outcomes {
        match outcome {
            Ok(report) => run.levels.push(InstrumentLevels { instrument, report }),
            Err(e) => {
                log::warn!("skipping {} ({})", instrument, e);
                run.failed.push((instrument, e));
            }
        }
    }
    Ok(run)
}

fn run_levels(
    config_path: &PathBuf,
    instrument_override: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<&PathBuf>,
    format: ReportFormat,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_levels_config(&config) {
        return fail(e);
    }

    // Stage 2: Parameters, window and universe
    let params = match build_detect_params(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let window = match build_window(&config, "levels", start, end) {
        Ok(w) => w,
        Err(e) => return fail(e),
    };
    let instruments = match resolve_instruments(instrument_override, &config, "levels") {
        Ok(i) => i,
        Err(e) => return fail(e),
    };

    // Stage 3: Data source and cache
    let data_port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let cache = config
        .get_bool("cache", "enabled", true)
        .then(InMemoryLevelCache::new);

    eprintln!(
        "Detecting levels: {} instruments, method {}, order {}, tolerance {}%",
        instruments.len(),
        params.method,
        params.order,
        params.tolerance_pct
    );

    // Stage 4: Detection
    let LevelsRun { levels, failed } = match run_levels_pipeline(
        data_port.as_ref(),
        cache.as_ref().map(|c| c as &dyn LevelCache),
        &instruments,
        window,
        &params,
    ) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    if levels.is_empty() {
        eprintln!("error: no instruments with data to analyze");
        return ExitCode::from(5);
    }

    // Stage 5: Console summary
    eprintln!("\n=== Levels ===");
    for entry in &levels {
        match entry.report.status {
            DetectionStatus::InsufficientData { bars, required } => {
                eprintln!(
                    "  {}:  insufficient data ({} bars, {} required)",
                    entry.instrument, bars, required
                );
            }
            DetectionStatus::Evaluated { bars, pivots } => {
                eprintln!(
                    "  {}:  {} bars, {} candidates, {} support, {} resistance",
                    entry.instrument,
                    bars,
                    pivots,
                    entry.report.supports().count(),
                    entry.report.resistances().count(),
                );
                for band in &entry.report.bands {
                    eprintln!(
                        "    {:<10} {:>12.4}  [{:.4} - {:.4}]  {} touches, last {}",
                        band.kind.to_string(),
                        band.center_price,
                        band.lower,
                        band.upper,
                        band.touch_count,
                        band.last_date,
                    );
                }
            }
        }
    }

    for (instrument, e) in &failed {
        eprintln!("  {}:  failed ({})", instrument, e);
    }

    // Stage 6: Report
    if let Err(e) = emit_levels(&levels, output, format) {
        return fail(e);
    }
    match failed.first() {
        Some((_, e)) => {
            eprintln!(
                "warning: {} of {} instruments failed",
                failed.len(),
                instruments.len()
            );
            ExitCode::from(e)
        }
        None => ExitCode::SUCCESS,
    }
}

fn run_compare(
    config_path: &PathBuf,
    instrument_override: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<&PathBuf>,
    format: ReportFormat,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_compare_config(&config) {
        return fail(e);
    }

    let window = match build_window(&config, "compare", start, end) {
        Ok(w) => w,
        Err(e) => return fail(e),
    };
    let instruments = match resolve_instruments(instrument_override, &config, "compare") {
        Ok(i) => i,
        Err(e) => return fail(e),
    };
    let data_port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    eprintln!("Comparing {} instruments", instruments.len());
    let comparison = match pipeline::compare(data_port.as_ref(), &instruments, window) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    eprintln!("\n=== Performance ===");
    let mut last: BTreeMap<&str, f64> = BTreeMap::new();
    for point in &comparison.points {
        last.insert(point.instrument.as_str(), point.pct_change);
    }
    for (instrument, change) in &last {
        eprintln!("  {}:  {:+.2}%", instrument, change * 100.0);
    }
    for exclusion in &comparison.excluded {
        match exclusion.reason {
            ExclusionReason::NoObservations => {
                eprintln!("  {}:  excluded (no data in range)", exclusion.instrument)
            }
            ExclusionReason::NonPositiveBase { close } => eprintln!(
                "  {}:  excluded (first close {})",
                exclusion.instrument, close
            ),
        }
    }

    match emit_comparison(&comparison, output, format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn run_ratio(
    config_path: &PathBuf,
    numerator: &str,
    denominator: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<&PathBuf>,
    format: ReportFormat,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let window = match build_window(&config, "compare", start, end) {
        Ok(w) => w,
        Err(e) => return fail(e),
    };
    let data_port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let ratio = match pipeline::ratio(data_port.as_ref(), numerator, denominator, window) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    match (ratio.bars.first(), ratio.bars.last()) {
        (Some(first), Some(last)) => eprintln!(
            "{}/{}: {} bars ({} common dates), {} to {}, close {:.4} -> {:.4}",
            numerator,
            denominator,
            ratio.bars.len(),
            ratio.common_dates,
            first.date,
            last.date,
            first.close,
            last.close
        ),
        _ => eprintln!("{}/{}: no overlapping dates", numerator, denominator),
    }

    match emit_ratio(&ratio, output, format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn run_list(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let instruments = match data_port.list_instruments() {
        Ok(i) => i,
        Err(e) => return fail(e),
    };
    if instruments.is_empty() {
        eprintln!("No instruments found");
    } else {
        for instrument in &instruments {
            println!("{}", instrument);
        }
        eprintln!("{} instruments found", instruments.len());
    }
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf, instrument_override: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = match open_data_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let instruments = match instrument_override {
        Some(list) => match parse_instruments(list) {
            Ok(i) => i,
            Err(e) => return fail(LevelscopeError::invalid_argument("instrument", e.to_string())),
        },
        None => match data_port.list_instruments() {
            Ok(i) => i,
            Err(e) => return fail(e),
        },
    };

    for instrument in &instruments {
        match data_port.get_data_range(instrument) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", instrument, count, min_date, max_date);
            }
            Ok(None) => eprintln!("{}: no data found", instrument),
            Err(e) => eprintln!("error querying {}: {}", instrument, e),
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let checks: [(&str, fn(&dyn ConfigPort) -> Result<(), LevelscopeError>); 3] = [
        ("data", validate_data_config),
        ("levels", validate_levels_config),
        ("compare", validate_compare_config),
    ];
    for (section, check) in checks {
        if let Err(e) = check(&config) {
            eprintln!("  [{section}] invalid");
            return fail(e);
        }
        eprintln!("  [{section}] ok");
    }

    match build_detect_params(&config) {
        Ok(params) => eprintln!(
            "\nLevels: method {}, order {}, tolerance {}%, min touches {}",
            params.method, params.order, params.tolerance_pct, params.min_touches
        ),
        Err(e) => return fail(e),
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

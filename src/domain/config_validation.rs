//! Configuration validation.
//!
//! Checks every config field a command reads before any data is fetched.

use crate::domain::error::LevelscopeError;
use crate::domain::levels::LevelMethod;
use crate::domain::universe::parse_instruments;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), LevelscopeError> {
    let source = config
        .get_trimmed("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.as_str() {
        "csv" => require(config, "data", "path"),
        "sqlite" => require(config, "sqlite", "path"),
        other => Err(LevelscopeError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: format!("unknown source '{other}' (expected csv or sqlite)"),
        }),
    }
}

pub fn validate_levels_config(config: &dyn ConfigPort) -> Result<(), LevelscopeError> {
    validate_positive_int(config, "levels", "order")?;
    validate_tolerance(config)?;
    validate_positive_int(config, "levels", "min_touches")?;
    validate_positive_int(config, "levels", "lookback")?;
    validate_positive_int(config, "levels", "max_levels")?;
    validate_method(config)?;
    validate_window(config, "levels")?;
    validate_instrument_list(config, "levels", 1)?;
    Ok(())
}

pub fn validate_compare_config(config: &dyn ConfigPort) -> Result<(), LevelscopeError> {
    validate_window(config, "compare")?;
    validate_instrument_list(config, "compare", 2)?;
    Ok(())
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), LevelscopeError> {
    match config.get_trimmed(section, key) {
        Some(_) => Ok(()),
        None => Err(LevelscopeError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Optional keys; when present they must parse as an integer >= 1.
fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), LevelscopeError> {
    let Some(raw) = config.get_trimmed(section, key) else {
        return Ok(());
    };
    match raw.parse::<i64>() {
        Ok(v) if v >= 1 => Ok(()),
        _ => Err(LevelscopeError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be a positive integer, got '{raw}'"),
        }),
    }
}

fn validate_tolerance(config: &dyn ConfigPort) -> Result<(), LevelscopeError> {
    let Some(raw) = config.get_trimmed("levels", "tolerance_pct") else {
        return Ok(());
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
        _ => Err(LevelscopeError::ConfigInvalid {
            section: "levels".to_string(),
            key: "tolerance_pct".to_string(),
            reason: format!("tolerance_pct must be a positive number, got '{raw}'"),
        }),
    }
}

fn validate_method(config: &dyn ConfigPort) -> Result<(), LevelscopeError> {
    let Some(raw) = config.get_trimmed("levels", "method") else {
        return Ok(());
    };
    raw.parse::<LevelMethod>()
        .map(|_| ())
        .map_err(|e| LevelscopeError::ConfigInvalid {
            section: "levels".to_string(),
            key: "method".to_string(),
            reason: e.to_string(),
        })
}

fn validate_window(config: &dyn ConfigPort, section: &str) -> Result<(), LevelscopeError> {
    let start = parse_date(config, section, "start_date")?;
    let end = parse_date(config, section, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(LevelscopeError::ConfigInvalid {
                section: section.to_string(),
                key: "start_date".to_string(),
                reason: "start_date must not be after end_date".to_string(),
            });
        }
    }
    Ok(())
}

fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, LevelscopeError> {
    match config.get_date(section, key) {
        None => Ok(None),
        Some(Ok(d)) => Ok(Some(d)),
        Some(Err(raw)) => Err(LevelscopeError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("invalid {key} '{raw}', expected YYYY-MM-DD"),
        }),
    }
}

/// The list is optional (command-line flags may supply it) but must parse.
fn validate_instrument_list(
    config: &dyn ConfigPort,
    section: &str,
    minimum: usize,
) -> Result<(), LevelscopeError> {
    let Some(raw) = config.get_string(section, "instruments") else {
        return Ok(());
    };
    let instruments = parse_instruments(&raw).map_err(|e| LevelscopeError::ConfigInvalid {
        section: section.to_string(),
        key: "instruments".to_string(),
        reason: e.to_string(),
    })?;
    if instruments.len() < minimum {
        return Err(LevelscopeError::ConfigInvalid {
            section: section.to_string(),
            key: "instruments".to_string(),
            reason: format!("at least {minimum} instruments required"),
        });
    }
    Ok(())
}

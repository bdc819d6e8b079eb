//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Detection parameters from `[levels]` (defaults, overrides, invalid values)
//! - Date windows from config and command-line overrides
//! - Instrument resolution
//! - Data source selection
//! - End-to-end `levels`, `compare` and `ratio` runs over CSV files on disk

use chrono::NaiveDate;
use levelscope::adapters::file_config_adapter::FileConfigAdapter;
use levelscope::cli::{self, Cli, Command, ReportFormat};
use levelscope::domain::error::LevelscopeError;
use levelscope::domain::levels::LevelMethod;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

fn same_code(code: ExitCode, expected: u8) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::from(expected))
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

mod detect_params {
    use super::*;

    #[test]
    fn defaults_when_section_absent() {
        let adapter = FileConfigAdapter::from_string("[data]\npath = /tmp\n").unwrap();
        let params = cli::build_detect_params(&adapter).unwrap();

        assert_eq!(params.order, 5);
        assert!((params.tolerance_pct - 1.0).abs() < f64::EPSILON);
        assert_eq!(params.min_touches, 2);
        assert_eq!(params.method, LevelMethod::Combined);
        assert_eq!(params.lookback, None);
        assert_eq!(params.max_levels, None);
    }

    #[test]
    fn custom_values() {
        let ini = r#"
[levels]
order = 3
tolerance_pct = 0.5
min_touches = 1
method = pivots
lookback = 250
max_levels = 4
"#;
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let params = cli::build_detect_params(&adapter).unwrap();

        assert_eq!(params.order, 3);
        assert!((params.tolerance_pct - 0.5).abs() < f64::EPSILON);
        assert_eq!(params.min_touches, 1);
        assert_eq!(params.method, LevelMethod::Pivots);
        assert_eq!(params.lookback, Some(250));
        assert_eq!(params.max_levels, Some(4));
    }

    #[test]
    fn zero_order_is_invalid() {
        let adapter = FileConfigAdapter::from_string("[levels]\norder = 0\n").unwrap();
        let err = cli::build_detect_params(&adapter).unwrap_err();
        assert!(matches!(err, LevelscopeError::ConfigInvalid { key, .. } if key == "order"));
    }

    #[test]
    fn negative_tolerance_is_invalid_argument() {
        let adapter = FileConfigAdapter::from_string("[levels]\ntolerance_pct = -1\n").unwrap();
        let err = cli::build_detect_params(&adapter).unwrap_err();
        assert!(matches!(err, LevelscopeError::InvalidArgument { name, .. } if name == "tolerance_pct"));
    }

    #[test]
    fn unknown_method() {
        let adapter = FileConfigAdapter::from_string("[levels]\nmethod = fibonacci\n").unwrap();
        let err = cli::build_detect_params(&adapter).unwrap_err();
        assert!(matches!(err, LevelscopeError::ConfigInvalid { key, .. } if key == "method"));
    }
}

mod windows {
    use super::*;

    #[test]
    fn no_dates_means_full_history() {
        let adapter = FileConfigAdapter::from_string("[levels]\norder = 3\n").unwrap();
        assert_eq!(cli::build_window(&adapter, "levels", None, None).unwrap(), None);
    }

    #[test]
    fn config_dates() {
        let ini = "[compare]\nstart_date = 2023-01-01\nend_date = 2023-12-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let window = cli::build_window(&adapter, "compare", None, None)
            .unwrap()
            .unwrap();
        assert_eq!(window.start, d(2023, 1, 1));
        assert_eq!(window.end, d(2023, 12, 31));
    }

    #[test]
    fn command_line_overrides_config() {
        let ini = "[levels]\nstart_date = 2023-01-01\nend_date = 2023-12-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let window = cli::build_window(&adapter, "levels", Some(d(2023, 6, 1)), None)
            .unwrap()
            .unwrap();
        assert_eq!(window.start, d(2023, 6, 1));
        assert_eq!(window.end, d(2023, 12, 31));
    }

    #[test]
    fn single_bound_leaves_other_open() {
        let adapter = FileConfigAdapter::from_string("[levels]\n").unwrap();
        let window = cli::build_window(&adapter, "levels", None, Some(d(2020, 1, 1)))
            .unwrap()
            .unwrap();
        assert!(window.contains(d(1990, 5, 5)));
        assert!(!window.contains(d(2020, 1, 2)));
    }

    #[test]
    fn inverted_range_is_invalid_argument() {
        let adapter = FileConfigAdapter::from_string("[levels]\n").unwrap();
        let err =
            cli::build_window(&adapter, "levels", Some(d(2024, 1, 2)), Some(d(2024, 1, 1)))
                .unwrap_err();
        assert!(matches!(err, LevelscopeError::InvalidArgument { .. }));
    }

    #[test]
    fn malformed_date() {
        let adapter = FileConfigAdapter::from_string("[levels]\nstart_date = 2024/01/01\n").unwrap();
        let err = cli::build_window(&adapter, "levels", None, None).unwrap_err();
        assert!(matches!(err, LevelscopeError::ConfigInvalid { key, .. } if key == "start_date"));
    }
}

mod instrument_resolution {
    use super::*;

    #[test]
    fn override_takes_precedence() {
        let adapter = FileConfigAdapter::from_string("[levels]\ninstruments = A,B\n").unwrap();
        let ids = cli::resolve_instruments(Some("IBE.MC"), &adapter, "levels").unwrap();
        assert_eq!(ids, vec!["IBE.MC"]);
    }

    #[test]
    fn from_config_trimmed_case_kept() {
        let adapter =
            FileConfigAdapter::from_string("[compare]\ninstruments =  san.MC , IBE.MC \n").unwrap();
        let ids = cli::resolve_instruments(None, &adapter, "compare").unwrap();
        assert_eq!(ids, vec!["san.MC", "IBE.MC"]);
    }

    #[test]
    fn missing_list() {
        let adapter = FileConfigAdapter::from_string("[levels]\norder = 2\n").unwrap();
        let err = cli::resolve_instruments(None, &adapter, "levels").unwrap_err();
        assert!(matches!(err, LevelscopeError::ConfigMissing { key, .. } if key == "instruments"));
    }

    #[test]
    fn duplicate_in_override() {
        let adapter = FileConfigAdapter::from_string("[levels]\n").unwrap();
        let err = cli::resolve_instruments(Some("A,A"), &adapter, "levels").unwrap_err();
        assert!(matches!(err, LevelscopeError::InvalidArgument { .. }));
    }
}

mod data_source {
    use super::*;

    #[test]
    fn csv_requires_path() {
        let adapter = FileConfigAdapter::from_string("[data]\nsource = csv\n").unwrap();
        assert!(matches!(
            cli::open_data_port(&adapter),
            Err(LevelscopeError::ConfigMissing { key, .. }) if key == "path"
        ));
    }

    #[test]
    fn unknown_source() {
        let adapter = FileConfigAdapter::from_string("[data]\nsource = parquet\n").unwrap();
        assert!(matches!(
            cli::open_data_port(&adapter),
            Err(LevelscopeError::ConfigInvalid { key, .. }) if key == "source"
        ));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_source_opens_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("prices.db");
        let ini = format!("[data]\nsource = sqlite\n\n[sqlite]\npath = {}\n", db.display());
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let port = cli::open_data_port(&adapter).unwrap();
        assert!(port.list_instruments().unwrap().is_empty());
    }
}

mod end_to_end {
    use super::*;

    fn write_csv(dir: &Path, instrument: &str, closes: &[f64]) {
        let mut content = String::from("Date,Open,High,Low,Close,Volume\n");
        for (i, close) in closes.iter().enumerate() {
            let date = d(2024, 1, 1) + chrono::Duration::days(i as i64);
            content.push_str(&format!("{date},{close},{close},{close},{close},100\n"));
        }
        std::fs::write(dir.join(format!("{instrument}.csv")), content).unwrap();
    }

    fn setup() -> (tempfile::TempDir, tempfile::NamedTempFile) {
        let dir = tempfile::TempDir::new().unwrap();
        let v: Vec<f64> = (0..21).map(|i| 50.0 + (i as f64 - 10.0).abs()).collect();
        write_csv(dir.path(), "V", &v);
        write_csv(dir.path(), "FLAT", &[100.0; 21]);

        let ini = format!(
            r#"
[data]
source = csv
path = {}

[levels]
instruments = V, FLAT
order = 5
tolerance_pct = 1.0
min_touches = 1
method = pivots

[compare]
instruments = V, FLAT
"#,
            dir.path().display()
        );
        let config = write_temp_ini(&ini);
        (dir, config)
    }

    fn levels_command(config: PathBuf, instrument: Option<&str>, output: PathBuf) -> Command {
        Command::Levels {
            config,
            instrument: instrument.map(str::to_string),
            start: None,
            end: None,
            output: Some(output),
            format: ReportFormat::Json,
        }
    }

    #[test]
    fn levels_writes_json_report() {
        let (dir, config) = setup();
        let output = dir.path().join("levels.json");

        let code = cli::run(Cli {
            command: levels_command(config.path().to_path_buf(), None, output.clone()),
        });
        assert!(is_success(code));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["instrument"], "V");
        assert_eq!(json[0]["bands"].as_array().unwrap().len(), 1);
        assert_eq!(json[0]["bands"][0]["kind"], "support");
        assert_eq!(json[1]["instrument"], "FLAT");
        assert_eq!(json[1]["bands"].as_array().unwrap().len(), 0);
        assert_eq!(json[1]["status"]["state"], "evaluated");
    }

    #[test]
    fn levels_with_only_missing_instruments_fails() {
        let (dir, config) = setup();
        let output = dir.path().join("levels.json");

        let code = cli::run(Cli {
            command: levels_command(config.path().to_path_buf(), Some("NOPE"), output.clone()),
        });
        assert!(same_code(code, 5));
        assert!(!output.exists());
    }

    #[test]
    fn levels_with_some_missing_instruments_reports_and_fails() {
        let (dir, config) = setup();
        let output = dir.path().join("levels.json");

        let code = cli::run(Cli {
            command: levels_command(config.path().to_path_buf(), Some("V,GHOST"), output.clone()),
        });
        assert!(same_code(code, 5));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["instrument"], "V");
    }

    #[test]
    fn levels_csv_keeps_bandless_instruments() {
        let (dir, config) = setup();
        let output = dir.path().join("levels.csv");

        let code = cli::run(Cli {
            command: Command::Levels {
                config: config.path().to_path_buf(),
                instrument: None,
                start: None,
                end: None,
                output: Some(output.clone()),
                format: ReportFormat::Csv,
            },
        });
        assert!(is_success(code));

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("V,evaluated,21,support,"));
        assert!(content.contains("FLAT,evaluated,21,,,,,,,"));
    }

    #[test]
    fn compare_writes_csv_report() {
        let (dir, config) = setup();
        let output = dir.path().join("compare.csv");

        let code = cli::run(Cli {
            command: Command::Compare {
                config: config.path().to_path_buf(),
                instruments: None,
                start: Some(d(2024, 1, 11)),
                end: None,
                output: Some(output.clone()),
                format: ReportFormat::Csv,
            },
        });
        assert!(is_success(code));

        let content = std::fs::read_to_string(&output).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("date,instrument,close,pct_change,filled"));
        // 11 dates from Jan 11 for each of two instruments
        assert_eq!(lines.count(), 22);
        assert!(content.contains("2024-01-11,V,50,0,false"));
    }

    #[test]
    fn compare_missing_instrument_is_data_unavailable() {
        let (dir, config) = setup();
        let code = cli::run(Cli {
            command: Command::Compare {
                config: config.path().to_path_buf(),
                instruments: Some("V,GHOST".to_string()),
                start: None,
                end: None,
                output: Some(dir.path().join("c.json")),
                format: ReportFormat::Json,
            },
        });
        assert!(same_code(code, 5));
    }

    #[test]
    fn ratio_writes_json() {
        let (dir, config) = setup();
        let output = dir.path().join("ratio.json");
        let code = cli::run(Cli {
            command: Command::Ratio {
                config: config.path().to_path_buf(),
                numerator: "FLAT".to_string(),
                denominator: "V".to_string(),
                start: None,
                end: None,
                output: Some(output.clone()),
                format: ReportFormat::Json,
            },
        });
        assert!(is_success(code));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["numerator"], "FLAT");
        assert_eq!(json["bars"].as_array().unwrap().len(), 21);
        assert_eq!(json["bars"][10]["close"], 2.0);
    }

    #[test]
    fn validate_accepts_setup_config() {
        let (_dir, config) = setup();
        let code = cli::run(Cli {
            command: Command::Validate {
                config: config.path().to_path_buf(),
            },
        });
        assert!(is_success(code));
    }

    #[test]
    fn validate_rejects_bad_levels_section() {
        let config = write_temp_ini("[data]\npath = /tmp\n\n[levels]\nmin_touches = zero\n");
        let code = cli::run(Cli {
            command: Command::Validate {
                config: config.path().to_path_buf(),
            },
        });
        assert!(same_code(code, 2));
    }

    #[test]
    fn missing_config_file() {
        let code = cli::run(Cli {
            command: Command::List {
                config: PathBuf::from("/nonexistent/levelscope.ini"),
            },
        });
        assert!(same_code(code, 2));
    }
}

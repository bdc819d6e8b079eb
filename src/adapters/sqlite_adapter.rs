//! SQLite price store adapter.

use crate::domain::error::LevelscopeError;
use crate::domain::ohlcv::{DateRange, OhlcvBar, PriceSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_error(e: impl std::fmt::Display) -> LevelscopeError {
    LevelscopeError::Database {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LevelscopeError> {
        let db_path =
            config
                .get_trimmed("sqlite", "path")
                .ok_or_else(|| LevelscopeError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, LevelscopeError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, LevelscopeError> {
        self.pool.get().map_err(db_error)
    }

    pub fn initialize_schema(&self) -> Result<(), LevelscopeError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS prices (
                    instrument TEXT NOT NULL,
                    date TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    PRIMARY KEY (instrument, date)
                );
                CREATE INDEX IF NOT EXISTS idx_prices_date ON prices(date);",
            )
            .map_err(db_error)
    }

    /// Upserts, so re-importing a refreshed history replaces stale rows.
    pub fn insert_series(
        &self,
        instrument: &str,
        series: &PriceSeries,
    ) -> Result<(), LevelscopeError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_error)?;

        for bar in series.bars() {
            tx.execute(
                "INSERT OR REPLACE INTO prices (instrument, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    instrument,
                    bar.date.format("%Y-%m-%d").to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(db_error)?;
        }

        tx.commit().map_err(db_error)
    }

    fn query_bars(
        &self,
        instrument: &str,
        window: Option<DateRange>,
    ) -> Result<Vec<OhlcvBar>, LevelscopeError> {
        let conn = self.conn()?;
        let (start, end) = match window {
            Some(r) => (
                r.start.format("%Y-%m-%d").to_string(),
                r.end.format("%Y-%m-%d").to_string(),
            ),
            None => ("0000-01-01".to_string(), "9999-12-31".to_string()),
        };

        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume
                 FROM prices
                 WHERE instrument = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(db_error)?;

        let rows = stmt
            .query_map(params![instrument, start, end], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(OhlcvBar {
                    date,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })
            .map_err(db_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_series(
        &self,
        instrument: &str,
        window: Option<DateRange>,
    ) -> Result<PriceSeries, LevelscopeError> {
        let bars = self
            .query_bars(instrument, window)
            .map_err(|e| LevelscopeError::data_unavailable(instrument, e.to_string()))?;
        if bars.is_empty() {
            return Err(LevelscopeError::data_unavailable(
                instrument,
                "no rows in requested window",
            ));
        }
        PriceSeries::new(bars).map_err(|e| LevelscopeError::data_unavailable(instrument, e.to_string()))
    }

    fn list_instruments(&self) -> Result<Vec<String>, LevelscopeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT instrument FROM prices ORDER BY instrument")
            .map_err(db_error)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_error)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(db_error)
    }

    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LevelscopeError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM prices WHERE instrument = ?1",
                params![instrument],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(db_error)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = NaiveDate::parse_from_str(&min_str, "%Y-%m-%d").map_err(db_error)?;
                let max = NaiveDate::parse_from_str(&max_str, "%Y-%m-%d").map_err(db_error)?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

//! SQLite Panel Store adapter.
//!
//! The one owner of mutable, persisted state: the daily-bar panel, the
//! benchmark index panel and the universe metadata. Upserts are
//! `INSERT OR REPLACE` keyed by the primary key, so re-ingesting a batch is
//! idempotent by construction.

use crate::domain::bar::{AdjustedBar, DailyBar, IndexBar, SymbolMeta};
use crate::domain::error::ScreenerError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{BoundsViolation, PanelStore};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn db_err(e: r2d2::Error) -> ScreenerError {
    ScreenerError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> ScreenerError {
    ScreenerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_stored_date(raw: &str) -> Result<NaiveDate, ScreenerError> {
    NaiveDate::parse_from_str(raw, DATE_FMT).map_err(|e| ScreenerError::Database {
        reason: format!("stored date {raw:?}: {e}"),
    })
}

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScreenerError> {
        let db_path =
            config
                .get_string("store", "path")
                .ok_or_else(|| ScreenerError::ConfigMissing {
                    section: "store".into(),
                    key: "path".into(),
                })?;
        let pool_size = config.get_int("store", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, ScreenerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    /// Create tables and indexes. A failure here is the only fatal fault in
    /// the pipeline.
    pub fn initialize_schema(&self) -> Result<(), ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS fno_symbols (
                symbol TEXT PRIMARY KEY,
                company_name TEXT NOT NULL,
                lot_size INTEGER NOT NULL,
                last_updated TEXT
            );
            CREATE TABLE IF NOT EXISTS daily_bars (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                series TEXT,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                prev_close REAL,
                volume INTEGER NOT NULL,
                value REAL NOT NULL,
                vwap REAL,
                trades INTEGER,
                delivery_volume INTEGER NOT NULL,
                delivery_pct REAL NOT NULL,
                PRIMARY KEY (symbol, date)
            );
            CREATE INDEX IF NOT EXISTS idx_daily_bars_date ON daily_bars(date);
            CREATE TABLE IF NOT EXISTS index_bars (
                index_name TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                PRIMARY KEY (index_name, date)
            );",
        )
        .map_err(query_err)
    }

    fn daily_bar_from_row(row: &Row<'_>) -> rusqlite::Result<DailyBar> {
        let date_str: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FMT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                date_str.len(),
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(DailyBar {
            symbol: row.get(0)?,
            date,
            series: row.get(2)?,
            open: row.get(3)?,
            high: row.get(4)?,
            low: row.get(5)?,
            close: row.get(6)?,
            prev_close: row.get(7)?,
            volume: row.get(8)?,
            value: row.get(9)?,
            vwap: row.get(10)?,
            trades: row.get(11)?,
            delivery_volume: row.get(12)?,
            delivery_pct: row.get(13)?,
        })
    }

    fn count(&self, sql: &str) -> Result<usize, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let n: i64 = conn.query_row(sql, [], |row| row.get(0)).map_err(query_err)?;
        Ok(n as usize)
    }
}

impl PanelStore for SqliteStore {
    fn upsert_bars(&self, bars: &[DailyBar]) -> Result<usize, ScreenerError> {
        if bars.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO daily_bars
                 (symbol, date, series, open, high, low, close, prev_close,
                  volume, value, vwap, trades, delivery_volume, delivery_pct)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    bar.symbol,
                    bar.date.format(DATE_FMT).to_string(),
                    bar.series,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.prev_close,
                    bar.volume,
                    bar.value,
                    bar.vwap,
                    bar.trades,
                    bar.delivery_volume,
                    bar.delivery_pct,
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(bars.len())
    }

    fn upsert_index_bars(&self, bars: &[IndexBar]) -> Result<usize, ScreenerError> {
        if bars.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO index_bars (index_name, date, open, high, low, close)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    bar.index_name,
                    bar.date.format(DATE_FMT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(bars.len())
    }

    fn upsert_symbols(&self, metas: &[SymbolMeta]) -> Result<usize, ScreenerError> {
        if metas.is_empty() {
            return Ok(0);
        }
        let stamp = Utc::now().naive_utc().format(TIMESTAMP_FMT).to_string();
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;
        for meta in metas {
            tx.execute(
                "INSERT OR REPLACE INTO fno_symbols (symbol, company_name, lot_size, last_updated)
                 VALUES (?1, ?2, ?3, ?4)",
                params![meta.symbol, meta.company_name, meta.lot_size, stamp],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(metas.len())
    }

    fn latest_date(&self) -> Result<Option<NaiveDate>, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let max: Option<String> = conn
            .query_row("SELECT MAX(date) FROM daily_bars", [], |row| row.get(0))
            .map_err(query_err)?;
        max.map(|raw| parse_stored_date(&raw)).transpose()
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM daily_bars ORDER BY symbol")
            .map_err(query_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row.map_err(query_err)?);
        }
        Ok(symbols)
    }

    fn fetch_series(&self, symbol: &str) -> Result<Vec<DailyBar>, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, date, series, open, high, low, close, prev_close,
                        volume, value, vwap, trades, delivery_volume, delivery_pct
                 FROM daily_bars WHERE symbol = ?1 ORDER BY date ASC",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![symbol], Self::daily_bar_from_row)
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_err)?);
        }
        Ok(bars)
    }

    fn fetch_index_series(&self, index_name: &str) -> Result<Vec<IndexBar>, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT index_name, date, open, high, low, close
                 FROM index_bars WHERE index_name = ?1 ORDER BY date ASC",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![index_name], |row| {
                let date_str: String = row.get(1)?;
                let date = NaiveDate::parse_from_str(&date_str, DATE_FMT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        date_str.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(IndexBar {
                    index_name: row.get(0)?,
                    date,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                })
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_err)?);
        }
        Ok(bars)
    }

    fn symbol_meta(&self, symbol: &str) -> Result<Option<SymbolMeta>, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, company_name, lot_size, last_updated
                 FROM fno_symbols WHERE symbol = ?1",
            )
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![symbol], |row| {
                let stamp: Option<String> = row.get(3)?;
                Ok(SymbolMeta {
                    symbol: row.get(0)?,
                    company_name: row.get(1)?,
                    lot_size: row.get(2)?,
                    last_updated: stamp
                        .and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FMT).ok()),
                })
            })
            .map_err(query_err)?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(query_err)?)),
            None => Ok(None),
        }
    }

    fn apply_adjustments(
        &self,
        symbol: &str,
        rows: &[AdjustedBar],
    ) -> Result<usize, ScreenerError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;
        let mut updated = 0;
        for row in rows {
            updated += tx
                .execute(
                    "UPDATE daily_bars
                     SET open = ?1, high = ?2, low = ?3, close = ?4, volume = ?5
                     WHERE symbol = ?6 AND date = ?7",
                    params![
                        row.open,
                        row.high,
                        row.low,
                        row.close,
                        row.volume,
                        symbol,
                        row.date.format(DATE_FMT).to_string(),
                    ],
                )
                .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(updated)
    }

    fn recompute_prev_close(&self, symbol: &str) -> Result<usize, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        conn.execute(
            "UPDATE daily_bars SET prev_close = (
                 SELECT prior.close FROM daily_bars prior
                 WHERE prior.symbol = daily_bars.symbol
                   AND prior.date < daily_bars.date
                 ORDER BY prior.date DESC LIMIT 1
             )
             WHERE symbol = ?1",
            params![symbol],
        )
        .map_err(query_err)
    }

    fn bounds_violations(&self) -> Result<Vec<BoundsViolation>, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, COUNT(*) FROM daily_bars
                 WHERE close < low OR close > high
                 GROUP BY symbol ORDER BY symbol",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BoundsViolation {
                    symbol: row.get(0)?,
                    rows: row.get::<_, i64>(1)? as usize,
                })
            })
            .map_err(query_err)?;

        let mut violations = Vec::new();
        for row in rows {
            violations.push(row.map_err(query_err)?);
        }
        Ok(violations)
    }

    fn symbol_count(&self) -> Result<usize, ScreenerError> {
        self.count("SELECT COUNT(*) FROM fno_symbols")
    }

    fn bar_count(&self) -> Result<usize, ScreenerError> {
        self.count("SELECT COUNT(*) FROM daily_bars")
    }

    fn positive_count(&self, date: NaiveDate) -> Result<usize, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM daily_bars
                 WHERE date = ?1 AND prev_close IS NOT NULL AND prev_close > 0
                   AND close > prev_close",
                params![date.format(DATE_FMT).to_string()],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(n as usize)
    }

    fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>, ScreenerError> {
        let conn = self.pool.get().map_err(db_err)?;
        let (min, max): (Option<String>, Option<String>) = conn
            .query_row("SELECT MIN(date), MAX(date) FROM daily_bars", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .map_err(query_err)?;
        match (min, max) {
            (Some(min), Some(max)) => Ok(Some((
                parse_stored_date(&min)?,
                parse_stored_date(&max)?,
            ))),
            _ => Ok(None),
        }
    }
}

//! File-backed source adapters over a directory of provider CSV dumps.
//!
//! Layout inside the dump directory:
//!
//! - `universe.csv` — `symbol,company_name,lot_size`
//! - `<SYMBOL>.csv` — the primary provider's raw rows, headers and string
//!   fields passed through untouched (normalization happens downstream)
//! - `<SYMBOL>_adjusted.csv` — adjusted series: `date,open,high,low,close,volume`
//!   with ISO dates
//! - `index_<NAME>.csv` — benchmark history, spaces in the name replaced by
//!   underscores: `date,open,high,low,close`

use crate::domain::bar::{AdjustedBar, IndexBar, SymbolMeta};
use crate::domain::error::ScreenerError;
use crate::ports::source_port::{AdjustedSource, PrimarySource, RawBatch};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvSourceDir {
    base_path: PathBuf,
}

impl CsvSourceDir {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn daily_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn adjusted_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}_adjusted.csv"))
    }

    fn index_path(&self, index_name: &str) -> PathBuf {
        self.base_path
            .join(format!("index_{}.csv", index_name.replace(' ', "_")))
    }

    fn read_error(&self, symbol: &str, path: &PathBuf, e: impl std::fmt::Display) -> ScreenerError {
        ScreenerError::Source {
            symbol: symbol.to_string(),
            reason: format!("{}: {e}", path.display()),
        }
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    what: &str,
    symbol: &str,
) -> Result<T, ScreenerError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(idx).ok_or_else(|| ScreenerError::Source {
        symbol: symbol.to_string(),
        reason: format!("missing {what} column"),
    })?;
    raw.trim().parse().map_err(|e| ScreenerError::Source {
        symbol: symbol.to_string(),
        reason: format!("invalid {what} value {raw:?}: {e}"),
    })
}

fn parse_iso_date(
    record: &csv::StringRecord,
    symbol: &str,
) -> Result<NaiveDate, ScreenerError> {
    let raw: String = parse_field(record, 0, "date", symbol)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| ScreenerError::Source {
        symbol: symbol.to_string(),
        reason: format!("invalid date {raw:?}: {e}"),
    })
}

impl PrimarySource for CsvSourceDir {
    fn fetch_universe(&self) -> Result<Vec<SymbolMeta>, ScreenerError> {
        let path = self.base_path.join("universe.csv");
        let content = fs::read_to_string(&path)
            .map_err(|e| self.read_error("universe", &path, e))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut metas = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.read_error("universe", &path, e))?;
            let symbol: String = parse_field(&record, 0, "symbol", "universe")?;
            let symbol = symbol.trim().to_uppercase();
            if symbol.is_empty() {
                continue;
            }
            metas.push(SymbolMeta {
                company_name: record.get(1).unwrap_or("").trim().to_string(),
                lot_size: record
                    .get(2)
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0),
                symbol,
                last_updated: None,
            });
        }
        Ok(metas)
    }

    /// Pass the provider's rows through raw; header spellings and string
    /// coercion are the normalizer's concern.
    fn fetch_daily(&self, symbol: &str) -> Result<RawBatch, ScreenerError> {
        let path = self.daily_path(symbol);
        let content =
            fs::read_to_string(&path).map_err(|e| self.read_error(symbol, &path, e))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| self.read_error(symbol, &path, e))?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.read_error(symbol, &path, e))?;
            rows.push(record.iter().map(String::from).collect());
        }
        Ok(RawBatch { headers, rows })
    }
}

impl AdjustedSource for CsvSourceDir {
    /// A missing adjusted dump means the secondary source has nothing for
    /// this symbol; that is a reportable repair failure, not an error.
    fn fetch_adjusted(
        &self,
        symbol: &str,
        from: NaiveDate,
    ) -> Result<Vec<AdjustedBar>, ScreenerError> {
        let path = self.adjusted_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&path).map_err(|e| self.read_error(symbol, &path, e))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.read_error(symbol, &path, e))?;
            let date = parse_iso_date(&record, symbol)?;
            if date < from {
                continue;
            }
            bars.push(AdjustedBar {
                date,
                open: parse_field(&record, 1, "open", symbol)?,
                high: parse_field(&record, 2, "high", symbol)?,
                low: parse_field(&record, 3, "low", symbol)?,
                close: parse_field(&record, 4, "close", symbol)?,
                volume: parse_field(&record, 5, "volume", symbol)?,
            });
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn fetch_index(
        &self,
        index_name: &str,
        from: NaiveDate,
    ) -> Result<Vec<IndexBar>, ScreenerError> {
        let path = self.index_path(index_name);
        let content = fs::read_to_string(&path)
            .map_err(|e| self.read_error(index_name, &path, e))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.read_error(index_name, &path, e))?;
            let date = parse_iso_date(&record, index_name)?;
            if date < from {
                continue;
            }
            bars.push(IndexBar {
                index_name: index_name.to_string(),
                date,
                open: parse_field(&record, 1, "open", index_name)?,
                high: parse_field(&record, 2, "high", index_name)?,
                low: parse_field(&record, 3, "low", index_name)?,
                close: parse_field(&record, 4, "close", index_name)?,
            });
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

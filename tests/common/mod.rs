#![allow(dead_code)]

use chrono::NaiveDate;
use fnoscreen::domain::bar::{AdjustedBar, DailyBar, IndexBar, SymbolMeta};
use fnoscreen::domain::error::ScreenerError;
use fnoscreen::ports::source_port::{AdjustedSource, PrimarySource, RawBatch};
use std::collections::HashMap;

/// Provider header row used by every mock batch.
pub const RAW_HEADERS: &[&str] = &[
    "Date",
    "Series",
    "OpenPrice",
    "HighPrice",
    "LowPrice",
    "ClosePrice",
    "PrevClose",
    "TotalTradedQuantity",
    "TurnoverInRs",
    "AveragePrice",
    "No.ofTrades",
    "DeliverableQty",
    "%DlyQttoTradedQty",
];

/// One provider row in the primary source's raw shape.
pub fn raw_row(
    date: &str,
    series: &str,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    prev_close: f64,
    volume: i64,
    delivery: i64,
) -> Vec<String> {
    vec![
        date.to_string(),
        series.to_string(),
        format!("{open:.2}"),
        format!("{high:.2}"),
        format!("{low:.2}"),
        format!("{close:.2}"),
        format!("{prev_close:.2}"),
        volume.to_string(),
        format!("{:.2}", close * volume as f64),
        format!("{close:.2}"),
        "1000".to_string(),
        delivery.to_string(),
        format!("{:.2}", delivery as f64 / volume.max(1) as f64 * 100.0),
    ]
}

pub fn batch(rows: Vec<Vec<String>>) -> RawBatch {
    RawBatch {
        headers: RAW_HEADERS.iter().map(|s| s.to_string()).collect(),
        rows,
    }
}

pub struct MockPrimary {
    pub batches: HashMap<String, RawBatch>,
    pub errors: Vec<String>,
}

impl MockPrimary {
    pub fn new() -> Self {
        Self {
            batches: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_batch(mut self, symbol: &str, batch: RawBatch) -> Self {
        self.batches.insert(symbol.to_string(), batch);
        self
    }

    pub fn with_error(mut self, symbol: &str) -> Self {
        self.errors.push(symbol.to_string());
        self
    }
}

impl PrimarySource for MockPrimary {
    fn fetch_universe(&self) -> Result<Vec<SymbolMeta>, ScreenerError> {
        let mut symbols: Vec<String> = self
            .batches
            .keys()
            .cloned()
            .chain(self.errors.iter().cloned())
            .collect();
        symbols.sort();
        Ok(symbols
            .into_iter()
            .map(|s| SymbolMeta {
                company_name: format!("{s} Ltd"),
                symbol: s,
                lot_size: 100,
                last_updated: None,
            })
            .collect())
    }

    fn fetch_daily(&self, symbol: &str) -> Result<RawBatch, ScreenerError> {
        if self.errors.iter().any(|s| s == symbol) {
            return Err(ScreenerError::Source {
                symbol: symbol.to_string(),
                reason: "simulated upstream failure".into(),
            });
        }
        Ok(self.batches.get(symbol).cloned().unwrap_or_default())
    }
}

pub struct MockAdjusted {
    pub series: HashMap<String, Vec<AdjustedBar>>,
    pub index: HashMap<String, Vec<IndexBar>>,
}

impl MockAdjusted {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_series(mut self, symbol: &str, rows: Vec<AdjustedBar>) -> Self {
        self.series.insert(symbol.to_string(), rows);
        self
    }

    pub fn with_index(mut self, name: &str, bars: Vec<IndexBar>) -> Self {
        self.index.insert(name.to_string(), bars);
        self
    }
}

impl AdjustedSource for MockAdjusted {
    fn fetch_adjusted(
        &self,
        symbol: &str,
        from: NaiveDate,
    ) -> Result<Vec<AdjustedBar>, ScreenerError> {
        Ok(self
            .series
            .get(symbol)
            .map(|rows| rows.iter().filter(|r| r.date >= from).cloned().collect())
            .unwrap_or_default())
    }

    fn fetch_index(
        &self,
        index_name: &str,
        from: NaiveDate,
    ) -> Result<Vec<IndexBar>, ScreenerError> {
        Ok(self
            .index
            .get(index_name)
            .map(|bars| bars.iter().filter(|b| b.date >= from).cloned().collect())
            .unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Provider-format date (dd-Mon-yyyy) for day `n` of a generated series.
pub fn provider_date(n: u32) -> String {
    (date(2025, 1, 1) + chrono::Duration::days(n as i64))
        .format("%d-%b-%Y")
        .to_string()
}

pub fn adjusted(n: u32, close: f64, volume: i64) -> AdjustedBar {
    AdjustedBar {
        date: date(2025, 1, 1) + chrono::Duration::days(n as i64),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume,
    }
}

pub fn index_bar(name: &str, n: u32, close: f64) -> IndexBar {
    IndexBar {
        index_name: name.to_string(),
        date: date(2025, 1, 1) + chrono::Duration::days(n as i64),
        open: close,
        high: close,
        low: close,
        close,
    }
}

pub fn daily_bar(symbol: &str, n: u32, close: f64, volume: i64) -> DailyBar {
    DailyBar {
        symbol: symbol.to_string(),
        date: date(2025, 1, 1) + chrono::Duration::days(n as i64),
        series: Some("EQ".into()),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        prev_close: Some(close),
        volume,
        value: close * volume as f64,
        vwap: None,
        trades: None,
        delivery_volume: volume / 2,
        delivery_pct: 50.0,
    }
}

//! Bar representations for the daily panel and the benchmark index.

use chrono::{NaiveDate, NaiveDateTime};

/// One price/volume/deliverable observation for a symbol on a trading date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    /// Instrument class reported by the provider ("EQ" after ingest filtering).
    pub series: Option<String>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Previous session's close. None only for a symbol's first observed date.
    pub prev_close: Option<f64>,
    pub volume: i64,
    /// Total traded value in currency units.
    pub value: f64,
    pub vwap: Option<f64>,
    pub trades: Option<i64>,
    pub delivery_volume: i64,
    /// Deliverable quantity as a percentage of traded quantity, 0..=100.
    pub delivery_pct: f64,
}

impl DailyBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Position of the close within the day's range: 0 = at the low,
    /// 1 = at the high. A degenerate range defaults to 0.5.
    pub fn close_location(&self) -> f64 {
        let range = self.high - self.low;
        if range > 0.0 {
            (self.close - self.low) / range
        } else {
            0.5
        }
    }
}

/// One benchmark-index observation. Never ranked directly; used only as a
/// return series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBar {
    pub index_name: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Universe membership record. Rows are upserted by ingestion and never
/// deleted once a symbol is admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMeta {
    pub symbol: String,
    pub company_name: String,
    pub lot_size: i64,
    pub last_updated: Option<NaiveDateTime>,
}

/// Adjusted OHLCV row from the secondary source. Delivery fields are not
/// provided by that source.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

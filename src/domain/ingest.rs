//! Normalization of raw provider batches into panel bars.
//!
//! The provider ships string-typed fields: thousands separators in numbers, a
//! bare dash for missing values, and dates in one of several day-month-year
//! spellings. Header names vary between provider revisions, so each source
//! declares a [`FieldMap`] of accepted spellings per field; the map is
//! resolved against the batch's header row once, and every record is then
//! normalized by column index.

use crate::domain::bar::DailyBar;
use crate::ports::source_port::RawBatch;
use chrono::NaiveDate;

/// Accepted date spellings, in priority order; first match wins.
pub const DATE_FORMATS: &[&str] = &["%d-%b-%Y", "%d-%m-%Y", "%Y-%m-%d", "%d %b %Y"];

/// Instrument class retained by ingestion; all other classes are dropped so a
/// trading day cannot appear twice for one symbol.
pub const PRIMARY_SERIES: &str = "EQ";

/// Accepted header spellings per field for one source.
pub struct FieldMap {
    pub date: &'static [&'static str],
    pub series: &'static [&'static str],
    pub open: &'static [&'static str],
    pub high: &'static [&'static str],
    pub low: &'static [&'static str],
    pub close: &'static [&'static str],
    pub prev_close: &'static [&'static str],
    pub volume: &'static [&'static str],
    pub value: &'static [&'static str],
    pub vwap: &'static [&'static str],
    pub trades: &'static [&'static str],
    pub delivery_volume: &'static [&'static str],
    pub delivery_pct: &'static [&'static str],
}

/// Header spellings used by the primary daily-bhavcopy source.
pub const PRIMARY_FIELD_MAP: FieldMap = FieldMap {
    date: &["Date", "TIMESTAMP"],
    series: &["Series"],
    open: &["OpenPrice", "Open Price", "OPEN"],
    high: &["HighPrice", "High Price", "HIGH"],
    low: &["LowPrice", "Low Price", "LOW"],
    close: &["ClosePrice", "Close Price", "CLOSE"],
    prev_close: &["PrevClose", "Prev Close", "PREV_CLOSE"],
    volume: &["TotalTradedQuantity", "Total Traded Quantity", "TTL_TRD_QNTY"],
    value: &["TurnoverInRs", "Turnover", "TURNOVER"],
    vwap: &["AveragePrice", "Average Price", "AVG_PRICE"],
    trades: &["No.ofTrades", "No. of Trades", "NO_OF_TRADES"],
    delivery_volume: &["DeliverableQty", "Deliverable Qty", "DELIV_QTY"],
    delivery_pct: &["%DlyQttoTradedQty", "% Dly Qt to Traded Qty", "DELIV_PER"],
};

/// Column indices after resolving a [`FieldMap`] against a header row.
#[derive(Debug)]
pub struct ResolvedMap {
    date: usize,
    close: usize,
    series: Option<usize>,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    prev_close: Option<usize>,
    volume: Option<usize>,
    value: Option<usize>,
    vwap: Option<usize>,
    trades: Option<usize>,
    delivery_volume: Option<usize>,
    delivery_pct: Option<usize>,
}

impl ResolvedMap {
    /// Resolve header spellings to indices. Returns `None` when a mandatory
    /// column (date, close) cannot be located at all.
    pub fn resolve(headers: &[String], map: &FieldMap) -> Option<Self> {
        let cleaned: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
        let locate = |candidates: &[&str]| -> Option<usize> {
            candidates
                .iter()
                .find_map(|c| cleaned.iter().position(|h| h.eq_ignore_ascii_case(c)))
        };

        Some(Self {
            date: locate(map.date)?,
            close: locate(map.close)?,
            series: locate(map.series),
            open: locate(map.open),
            high: locate(map.high),
            low: locate(map.low),
            prev_close: locate(map.prev_close),
            volume: locate(map.volume),
            value: locate(map.value),
            vwap: locate(map.vwap),
            trades: locate(map.trades),
            delivery_volume: locate(map.delivery_volume),
            delivery_pct: locate(map.delivery_pct),
        })
    }
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim_matches('"')
        .trim()
        .to_string()
}

/// Parse a provider decimal. Blank and "-" are missing; thousands separators
/// are stripped.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Parse a provider integer count; tolerates "123.0" spellings.
pub fn parse_count(raw: &str) -> Option<i64> {
    parse_decimal(raw).map(|v| v as i64)
}

/// Parse a provider date against the accepted format list, first match wins.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Per-batch normalization counters. Dropped rows are a data-quality signal,
/// never a batch failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub kept: usize,
    pub dropped_unparsable: usize,
    pub dropped_series: usize,
}

impl NormalizeSummary {
    pub fn merge(&mut self, other: NormalizeSummary) {
        self.kept += other.kept;
        self.dropped_unparsable += other.dropped_unparsable;
        self.dropped_series += other.dropped_series;
    }
}

fn field<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

/// Normalize one provider batch into panel bars for `symbol`. Rows of a
/// non-primary instrument class are dropped before anything else; rows with
/// an unparsable date or close are dropped and counted.
pub fn normalize_batch(
    symbol: &str,
    batch: &RawBatch,
    map: &FieldMap,
) -> (Vec<DailyBar>, NormalizeSummary) {
    let mut summary = NormalizeSummary::default();
    if batch.is_empty() {
        return (Vec::new(), summary);
    }

    let Some(resolved) = ResolvedMap::resolve(&batch.headers, map) else {
        summary.dropped_unparsable = batch.rows.len();
        return (Vec::new(), summary);
    };

    let mut bars = Vec::with_capacity(batch.rows.len());
    for row in &batch.rows {
        let series = match resolved.series {
            Some(i) => {
                let s = row.get(i).map(|v| v.trim()).unwrap_or("");
                if !s.is_empty() && s != PRIMARY_SERIES {
                    summary.dropped_series += 1;
                    continue;
                }
                Some(PRIMARY_SERIES.to_string())
            }
            None => None,
        };

        let Some(date) = row.get(resolved.date).and_then(|v| parse_date(v)) else {
            summary.dropped_unparsable += 1;
            continue;
        };
        let Some(close) = row.get(resolved.close).and_then(|v| parse_decimal(v)) else {
            summary.dropped_unparsable += 1;
            continue;
        };
        if close <= 0.0 {
            summary.dropped_unparsable += 1;
            continue;
        }

        bars.push(DailyBar {
            symbol: symbol.to_string(),
            date,
            series,
            open: parse_decimal(field(row, resolved.open)).unwrap_or(0.0),
            high: parse_decimal(field(row, resolved.high)).unwrap_or(0.0),
            low: parse_decimal(field(row, resolved.low)).unwrap_or(0.0),
            close,
            prev_close: parse_decimal(field(row, resolved.prev_close)).filter(|v| *v > 0.0),
            volume: parse_count(field(row, resolved.volume)).unwrap_or(0),
            value: parse_decimal(field(row, resolved.value)).unwrap_or(0.0),
            vwap: parse_decimal(field(row, resolved.vwap)),
            trades: parse_count(field(row, resolved.trades)),
            delivery_volume: parse_count(field(row, resolved.delivery_volume)).unwrap_or(0),
            delivery_pct: parse_decimal(field(row, resolved.delivery_pct)).unwrap_or(0.0),
        });
        summary.kept += 1;
    }

    (bars, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: &[&str] = &[
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

    fn batch(rows: Vec<Vec<String>>) -> RawBatch {
        RawBatch {
            headers: HEADERS.iter().map(|s| s.to_string()).collect(),
            rows,
        }
    }

    fn eq_row(date: &str, close: &str) -> Vec<String> {
        vec![
            date.into(),
            "EQ".into(),
            "100.00".into(),
            "105.50".into(),
            "98.25".into(),
            close.into(),
            "99.00".into(),
            "1,25,000".into(),
            "1,23,45,678.50".into(),
            "101.20".into(),
            "4,321".into(),
            "50,000".into(),
            "40.00".into(),
        ]
    }

    #[test]
    fn normalizes_thousands_separators_and_counts() {
        let (bars, summary) = normalize_batch(
            "SBIN",
            &batch(vec![eq_row("16-Jun-2025", "103.40")]),
            &PRIMARY_FIELD_MAP,
        );
        assert_eq!(summary.kept, 1);
        let bar = &bars[0];
        assert_eq!(bar.volume, 125_000);
        assert_eq!(bar.delivery_volume, 50_000);
        assert_eq!(bar.trades, Some(4_321));
        assert!((bar.value - 12_345_678.50).abs() < 1e-9);
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2025, 6, 16).unwrap());
    }

    #[test]
    fn date_formats_first_match_wins() {
        for raw in ["16-Jun-2025", "16-06-2025", "2025-06-16", "16 Jun 2025"] {
            assert_eq!(
                parse_date(raw),
                NaiveDate::from_ymd_opt(2025, 6, 16),
                "failed for {raw}"
            );
        }
        assert_eq!(parse_date("June 16, 2025"), None);
    }

    #[test]
    fn dash_and_blank_are_missing() {
        assert_eq!(parse_decimal("-"), None);
        assert_eq!(parse_decimal("  "), None);
        assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
        assert_eq!(parse_count("123.0"), Some(123));
        assert_eq!(parse_count("-"), None);
    }

    #[test]
    fn unparsable_date_drops_row_not_batch() {
        let (bars, summary) = normalize_batch(
            "SBIN",
            &batch(vec![
                eq_row("not-a-date", "103.40"),
                eq_row("17-Jun-2025", "104.00"),
            ]),
            &PRIMARY_FIELD_MAP,
        );
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.dropped_unparsable, 1);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 6, 17).unwrap());
    }

    #[test]
    fn missing_close_drops_row() {
        let (bars, summary) = normalize_batch(
            "SBIN",
            &batch(vec![eq_row("16-Jun-2025", "-")]),
            &PRIMARY_FIELD_MAP,
        );
        assert!(bars.is_empty());
        assert_eq!(summary.dropped_unparsable, 1);
    }

    #[test]
    fn non_primary_series_rows_are_filtered() {
        let mut bl_row = eq_row("16-Jun-2025", "103.40");
        bl_row[1] = "BL".into();
        let (bars, summary) = normalize_batch(
            "SBIN",
            &batch(vec![bl_row, eq_row("16-Jun-2025", "103.40")]),
            &PRIMARY_FIELD_MAP,
        );
        assert_eq!(summary.dropped_series, 1);
        assert_eq!(summary.kept, 1);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].series.as_deref(), Some("EQ"));
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let (bars, summary) = normalize_batch("SBIN", &RawBatch::default(), &PRIMARY_FIELD_MAP);
        assert!(bars.is_empty());
        assert_eq!(summary, NormalizeSummary::default());
    }

    #[test]
    fn headers_with_bom_and_quotes_resolve() {
        let mut b = batch(vec![eq_row("16-Jun-2025", "103.40")]);
        b.headers[0] = "\u{feff}\"Date\"".to_string();
        let (bars, summary) = normalize_batch("SBIN", &b, &PRIMARY_FIELD_MAP);
        assert_eq!(summary.kept, 1);
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn unmappable_headers_drop_every_row() {
        let b = RawBatch {
            headers: vec!["foo".into(), "bar".into()],
            rows: vec![vec!["1".into(), "2".into()]],
        };
        let (bars, summary) = normalize_batch("SBIN", &b, &PRIMARY_FIELD_MAP);
        assert!(bars.is_empty());
        assert_eq!(summary.dropped_unparsable, 1);
    }

    #[test]
    fn prev_close_zero_becomes_none() {
        let mut row = eq_row("16-Jun-2025", "103.40");
        row[6] = "0.00".into();
        let (bars, _) = normalize_batch("SBIN", &batch(vec![row]), &PRIMARY_FIELD_MAP);
        assert_eq!(bars[0].prev_close, None);
    }
}

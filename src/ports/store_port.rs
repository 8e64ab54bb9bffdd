//! Panel Store port trait: the only owner of mutable, persisted state.

use crate::domain::bar::{AdjustedBar, DailyBar, IndexBar, SymbolMeta};
use crate::domain::error::ScreenerError;
use chrono::NaiveDate;

/// A symbol whose panel still contains rows with the close outside the
/// [low, high] range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundsViolation {
    pub symbol: String,
    pub rows: usize,
}

pub trait PanelStore {
    /// Replace-on-conflict upsert keyed by (symbol, date). Returns the number
    /// of rows written. Idempotent: re-ingesting identical bars changes
    /// nothing.
    fn upsert_bars(&self, bars: &[DailyBar]) -> Result<usize, ScreenerError>;

    /// Same contract keyed by (index_name, date).
    fn upsert_index_bars(&self, bars: &[IndexBar]) -> Result<usize, ScreenerError>;

    /// Universe metadata upsert keyed by symbol, stamping last_updated.
    fn upsert_symbols(&self, metas: &[SymbolMeta]) -> Result<usize, ScreenerError>;

    /// Maximum trading date across all symbols; `None` on an empty store.
    /// Anchors every screen evaluation and the stats summary.
    fn latest_date(&self) -> Result<Option<NaiveDate>, ScreenerError>;

    fn list_symbols(&self) -> Result<Vec<String>, ScreenerError>;

    /// One symbol's full series, ascending by date.
    fn fetch_series(&self, symbol: &str) -> Result<Vec<DailyBar>, ScreenerError>;

    fn fetch_index_series(&self, index_name: &str) -> Result<Vec<IndexBar>, ScreenerError>;

    fn symbol_meta(&self, symbol: &str) -> Result<Option<SymbolMeta>, ScreenerError>;

    /// Overwrite open/high/low/close/volume for dates already present in the
    /// panel; dates the panel does not hold are skipped. Delivery fields are
    /// not touched. Returns the number of rows updated.
    fn apply_adjustments(
        &self,
        symbol: &str,
        rows: &[AdjustedBar],
    ) -> Result<usize, ScreenerError>;

    /// Rewrite prev_close as the lag-1 close over the symbol's ordered
    /// series; the first row gets NULL.
    fn recompute_prev_close(&self, symbol: &str) -> Result<usize, ScreenerError>;

    /// Symbols with rows violating `low <= close <= high`.
    fn bounds_violations(&self) -> Result<Vec<BoundsViolation>, ScreenerError>;

    fn symbol_count(&self) -> Result<usize, ScreenerError>;

    fn bar_count(&self) -> Result<usize, ScreenerError>;

    /// Rows on `date` with a positive previous close and a higher close.
    fn positive_count(&self, date: NaiveDate) -> Result<usize, ScreenerError>;

    fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>, ScreenerError>;
}

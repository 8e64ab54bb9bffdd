//! Upstream data source port traits.
//!
//! The primary source delivers provider-shaped, string-typed rows; the
//! secondary source delivers typed, corporate-action-adjusted series and the
//! benchmark index history. Live network clients implement these traits
//! outside this crate; the bundled [`crate::adapters::csv_source`] adapter
//! reads provider dumps from disk.

use crate::domain::bar::{AdjustedBar, IndexBar, SymbolMeta};
use crate::domain::error::ScreenerError;
use chrono::NaiveDate;

/// A raw provider batch: one header row plus string-typed records, exactly as
/// the upstream returns them (thousands separators, dashes for missing
/// values, textual day-month-year dates).
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawBatch {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Primary (unadjusted) source: universe membership and per-symbol daily rows.
pub trait PrimarySource {
    fn fetch_universe(&self) -> Result<Vec<SymbolMeta>, ScreenerError>;
    fn fetch_daily(&self, symbol: &str) -> Result<RawBatch, ScreenerError>;
}

/// Secondary (adjusted) source: repair series and benchmark index history.
pub trait AdjustedSource {
    fn fetch_adjusted(
        &self,
        symbol: &str,
        from: NaiveDate,
    ) -> Result<Vec<AdjustedBar>, ScreenerError>;

    fn fetch_index(
        &self,
        index_name: &str,
        from: NaiveDate,
    ) -> Result<Vec<IndexBar>, ScreenerError>;
}

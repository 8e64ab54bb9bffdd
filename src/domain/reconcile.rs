//! Corporate-action reconciliation: detect → repair → validate.
//!
//! The primary source ships unadjusted prices, so a split or bonus leaves a
//! structural discontinuity in the close series. Detection flags any symbol
//! with an implausible single-day move; repair substitutes the adjusted
//! series from the secondary source over the affected range; validation
//! re-runs the OHLC bounds check and reports what is still broken. The pass
//! holds no intermediate state and is idempotent on consistent data.

use crate::domain::error::ScreenerError;
use crate::ports::source_port::AdjustedSource;
use crate::ports::store_port::{BoundsViolation, PanelStore};
use chrono::NaiveDate;
use log::{info, warn};

/// A single-day close move beyond this fraction (either direction) marks a
/// corporate-action candidate.
pub const DISCONTINUITY_THRESHOLD: f64 = 0.30;

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub flagged: Vec<String>,
    pub repaired: Vec<String>,
    pub failed: Vec<String>,
    /// Symbols still failing the bounds check after repair. Informational;
    /// no second repair attempt is made.
    pub remaining: Vec<BoundsViolation>,
}

/// True when any consecutive close pair moves more than the threshold.
pub fn series_has_discontinuity(closes: &[f64]) -> bool {
    closes.windows(2).any(|pair| {
        let (prev, curr) = (pair[0], pair[1]);
        prev > 0.0 && ((curr - prev) / prev).abs() > DISCONTINUITY_THRESHOLD
    })
}

/// Scan every symbol's ordered close sequence for discontinuities.
pub fn detect_discontinuities(store: &dyn PanelStore) -> Result<Vec<String>, ScreenerError> {
    let mut flagged = Vec::new();
    for symbol in store.list_symbols()? {
        let closes: Vec<f64> = store
            .fetch_series(&symbol)?
            .iter()
            .map(|b| b.close)
            .collect();
        if series_has_discontinuity(&closes) {
            flagged.push(symbol);
        }
    }
    Ok(flagged)
}

/// Run the full detect → repair → validate pass. Repair is sequential per
/// symbol; each symbol's adjustments commit before the next fetch. A symbol
/// with no adjusted data is reported failed and left with its original
/// values.
pub fn reconcile(
    store: &dyn PanelStore,
    adjusted: &dyn AdjustedSource,
    cutover: NaiveDate,
) -> Result<ReconcileReport, ScreenerError> {
    let flagged = detect_discontinuities(store)?;
    info!("discontinuity scan flagged {} symbol(s)", flagged.len());

    let mut report = ReconcileReport {
        flagged: flagged.clone(),
        ..Default::default()
    };

    for symbol in &flagged {
        let rows = match adjusted.fetch_adjusted(symbol, cutover) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("adjusted fetch failed for {symbol}: {e}");
                report.failed.push(symbol.clone());
                continue;
            }
        };
        if rows.is_empty() {
            warn!("no adjusted data for {symbol}");
            report.failed.push(symbol.clone());
            continue;
        }

        let updated = store.apply_adjustments(symbol, &rows)?;
        if updated == 0 {
            warn!("adjusted series for {symbol} overlapped no panel rows");
            report.failed.push(symbol.clone());
            continue;
        }
        // The overwritten closes orphan the stored day-over-day anchors;
        // rebuild them from the repaired series.
        store.recompute_prev_close(symbol)?;
        info!("repaired {symbol}: {updated} row(s) overwritten");
        report.repaired.push(symbol.clone());
    }

    report.remaining = store.bounds_violations()?;
    if !report.remaining.is_empty() {
        warn!(
            "{} symbol(s) still violate OHLC bounds after repair",
            report.remaining.len()
        );
    }
    Ok(report)
}

/// Refresh the benchmark index series from the secondary source (it carries a
/// longer history than the primary provides).
pub fn refresh_benchmark(
    store: &dyn PanelStore,
    adjusted: &dyn AdjustedSource,
    index_name: &str,
    from: NaiveDate,
) -> Result<usize, ScreenerError> {
    let bars = adjusted.fetch_index(index_name, from)?;
    store.upsert_index_bars(&bars)
}

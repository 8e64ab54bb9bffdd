//! Indicator snapshots: pure, per-symbol projections of a date-ordered panel.
//!
//! Nothing here is persisted. A snapshot is recomputed on demand from the
//! Panel Store and discarded after use.

use crate::domain::bar::{DailyBar, IndexBar, SymbolMeta};
use crate::domain::window::{
    lookback, pct_return, round2, trailing_max, trailing_max_excl, trailing_mean,
    trailing_mean_excl, trailing_min_excl,
};
use chrono::{Datelike, NaiveDate};

pub const ATR_PERIOD: usize = 14;
pub const BREAKOUT_WINDOW: usize = 20;
pub const VOLUME_AVG_WINDOW: usize = 50;
pub const VOLUME_SPIKE_WINDOW: usize = 10;
/// Trailing rows approximating one calendar month (the reference close sits
/// 20 rows behind the current one).
pub const ONE_MONTH_OFFSET: usize = 20;
/// Trailing rows approximating one calendar year.
pub const ONE_YEAR_OFFSET: usize = 251;
pub const WEEK_52_WINDOW: usize = 252;

/// Derived view of one symbol at one as-of row.
#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    pub bar: DailyBar,
    /// Day-over-day change % from the stored previous close, 2 dp.
    pub change_pct: Option<f64>,
    pub sma_20: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub atr_14: f64,
    pub high_20_excl: Option<f64>,
    pub low_20_excl: Option<f64>,
    pub avg_vol_20_excl: Option<f64>,
    pub avg_vol_50_excl: Option<f64>,
    pub max_vol_10_excl: Option<f64>,
    pub avg_dvol_20_excl: Option<f64>,
    pub avg_dvol_50_excl: Option<f64>,
    pub max_dvol_10_excl: Option<f64>,
    pub high_52w: f64,
    /// (close - high_52w) / high_52w * 100. Non-positive by construction.
    pub delta_52w_high: Option<f64>,
    pub ytd_pct: Option<f64>,
    pub pct_1m: Option<f64>,
    pub pct_1y: Option<f64>,
    pub close_location: f64,
}

/// True Range per row, lag-1 close. The first row degenerates to high - low.
pub fn true_range_series(bars: &[DailyBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

/// YTD reference close: the first row on or after January 1 of the given year.
fn ytd_reference(bars: &[DailyBar], year: i32) -> Option<f64> {
    let anchor = NaiveDate::from_ymd_opt(year, 1, 1)?;
    bars.iter().find(|b| b.date >= anchor).map(|b| b.close)
}

/// Compute the snapshot for `bars[i]`. `bars` must be one symbol's series in
/// ascending date order.
pub fn snapshot_at(bars: &[DailyBar], i: usize) -> IndicatorSnapshot {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
    let dvolumes: Vec<f64> = bars.iter().map(|b| b.delivery_volume as f64).collect();
    let tr = true_range_series(bars);

    let bar = bars[i].clone();
    let high_52w = trailing_max(&highs, i, WEEK_52_WINDOW);
    let delta_52w_high = if high_52w > 0.0 {
        Some(round2((bar.close - high_52w) / high_52w * 100.0))
    } else {
        None
    };

    IndicatorSnapshot {
        change_pct: pct_return(bar.close, bar.prev_close.filter(|pc| *pc > 0.0)),
        sma_20: trailing_mean(&closes, i, 20),
        sma_50: trailing_mean(&closes, i, 50),
        sma_200: trailing_mean(&closes, i, 200),
        atr_14: trailing_mean(&tr, i, ATR_PERIOD),
        high_20_excl: trailing_max_excl(&highs, i, BREAKOUT_WINDOW),
        low_20_excl: trailing_min_excl(&lows, i, BREAKOUT_WINDOW),
        avg_vol_20_excl: trailing_mean_excl(&volumes, i, BREAKOUT_WINDOW),
        avg_vol_50_excl: trailing_mean_excl(&volumes, i, VOLUME_AVG_WINDOW),
        max_vol_10_excl: trailing_max_excl(&volumes, i, VOLUME_SPIKE_WINDOW),
        avg_dvol_20_excl: trailing_mean_excl(&dvolumes, i, BREAKOUT_WINDOW),
        avg_dvol_50_excl: trailing_mean_excl(&dvolumes, i, VOLUME_AVG_WINDOW),
        max_dvol_10_excl: trailing_max_excl(&dvolumes, i, VOLUME_SPIKE_WINDOW),
        high_52w,
        delta_52w_high,
        ytd_pct: pct_return(bar.close, ytd_reference(&bars[..=i], bar.date.year())),
        pct_1m: pct_return(bar.close, lookback(&closes, i, ONE_MONTH_OFFSET)),
        pct_1y: pct_return(bar.close, lookback(&closes, i, ONE_YEAR_OFFSET)),
        close_location: bar.close_location(),
        bar,
    }
}

/// Snapshot at the most recent row, or `None` for an empty series.
pub fn latest_snapshot(bars: &[DailyBar]) -> Option<IndicatorSnapshot> {
    if bars.is_empty() {
        None
    } else {
        Some(snapshot_at(bars, bars.len() - 1))
    }
}

/// 1-year return of a benchmark index series, computed the same way as the
/// per-symbol figure (reference close 251 rows back from the latest).
pub fn index_one_year_return(index_bars: &[IndexBar]) -> Option<f64> {
    if index_bars.is_empty() {
        return None;
    }
    let closes: Vec<f64> = index_bars.iter().map(|b| b.close).collect();
    let i = closes.len() - 1;
    pct_return(closes[i], lookback(&closes, i, ONE_YEAR_OFFSET))
}

/// Benchmark daily return on a specific date (close vs the previous index
/// row's close, unrounded). `None` when the date is absent or has no
/// predecessor.
pub fn index_daily_return(index_bars: &[IndexBar], on: NaiveDate) -> Option<f64> {
    let pos = index_bars.iter().position(|b| b.date == on)?;
    if pos == 0 {
        return None;
    }
    let prev = index_bars[pos - 1].close;
    if prev > 0.0 {
        Some((index_bars[pos].close - prev) / prev * 100.0)
    } else {
        None
    }
}

/// Per-symbol listing row: latest snapshot plus membership metadata, SMA
/// position flags and the benchmark-relative 1-year figure.
#[derive(Debug, Clone)]
pub struct SymbolOverview {
    pub meta: SymbolMeta,
    pub snapshot: IndicatorSnapshot,
    pub above_sma_20: bool,
    pub above_sma_50: bool,
    pub above_sma_200: bool,
    /// stock 1y return minus benchmark 1y return.
    pub rs_rank: Option<f64>,
}

pub fn symbol_overview(
    meta: SymbolMeta,
    bars: &[DailyBar],
    benchmark_1y: Option<f64>,
) -> Option<SymbolOverview> {
    let snapshot = latest_snapshot(bars)?;
    let rs_rank = snapshot
        .pct_1y
        .map(|r| round2(r - benchmark_1y.unwrap_or(0.0)));
    Some(SymbolOverview {
        above_sma_20: snapshot.bar.close > snapshot.sma_20,
        above_sma_50: snapshot.bar.close > snapshot.sma_50,
        above_sma_200: snapshot.bar.close > snapshot.sma_200,
        rs_rank,
        snapshot,
        meta,
    })
}

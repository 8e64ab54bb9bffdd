//! Screen evaluation against the latest-date indicator snapshots.
//!
//! # Evaluation semantics
//!
//! - Every screen is anchored at the store's latest trading date; a symbol
//!   whose series does not end on that date is skipped.
//! - A missing indicator (empty exclusive window, no predecessor close, zero
//!   average volume under a multiplier) makes the predicate false — the
//!   symbol is excluded, never an error.
//! - Rows are ordered by the screen's fixed ranking keys before returning.

use crate::domain::bar::DailyBar;
use crate::domain::error::ScreenerError;
use crate::domain::screen::{
    self, Direction, ScreenKind, ScreenOutput, ScreenRow, ScreenSpec, Strength, VolumeSource,
    CLOSE_LOCATION_MAX, DELIVERY_SURGE_MULT, MIN_PRICE, RELATIVE_WEAKNESS_MAX,
    STRONG_VOLUME_MULT, VOLUME_EXPLOSION_MULT,
};
use crate::domain::snapshot::{index_daily_return, latest_snapshot, IndicatorSnapshot};
use crate::domain::window::round2;
use crate::ports::store_port::PanelStore;

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Look up a screen by id and evaluate it. Unknown ids are the caller's
/// 404-equivalent; store faults carry their message as the 500-equivalent.
pub fn run_screen(
    store: &dyn PanelStore,
    id: &str,
    benchmark: &str,
) -> Result<ScreenOutput, ScreenerError> {
    let spec = screen::find(id).ok_or_else(|| ScreenerError::UnknownScreen { id: id.into() })?;
    evaluate(store, spec, benchmark)
}

pub fn evaluate(
    store: &dyn PanelStore,
    spec: &ScreenSpec,
    benchmark: &str,
) -> Result<ScreenOutput, ScreenerError> {
    let Some(as_of) = store.latest_date()? else {
        return Ok(empty_output(spec));
    };

    // The benchmark's same-day return is only consulted by the weakness
    // screen; a missing index row counts as a flat benchmark.
    let benchmark_daily = match spec.kind {
        ScreenKind::RelativeWeakness => {
            let index = store.fetch_index_series(benchmark)?;
            index_daily_return(&index, as_of).unwrap_or(0.0)
        }
        _ => 0.0,
    };

    let mut ranked: Vec<(RankKey, ScreenRow)> = Vec::new();
    for symbol in store.list_symbols()? {
        let bars = store.fetch_series(&symbol)?;
        let Some(snap) = latest_snapshot(&bars) else {
            continue;
        };
        if snap.bar.date != as_of {
            continue;
        }
        if let Some(entry) = evaluate_symbol(&spec.kind, &snap, benchmark_daily) {
            ranked.push(entry);
        }
    }

    ranked.sort_by(|(a, _), (b, _)| a.cmp(b));

    Ok(ScreenOutput {
        screen: spec.title,
        count: ranked.len(),
        columns: spec.columns,
        results: ranked.into_iter().map(|(_, row)| row).collect(),
    })
}

fn empty_output(spec: &ScreenSpec) -> ScreenOutput {
    ScreenOutput {
        screen: spec.title,
        count: 0,
        columns: spec.columns,
        results: Vec::new(),
    }
}

/// Composite sort key. `primary` ascends; equal primaries fall back to
/// `secondary` descending.
#[derive(Debug, PartialEq)]
struct RankKey {
    primary: f64,
    secondary: f64,
}

impl RankKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.primary
            .partial_cmp(&other.primary)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                other
                    .secondary
                    .partial_cmp(&self.secondary)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    }
}

fn source_values(snap: &IndicatorSnapshot, source: VolumeSource) -> (f64, Option<f64>, Option<f64>, Option<f64>) {
    match source {
        VolumeSource::Traded => (
            snap.bar.volume as f64,
            snap.avg_vol_20_excl,
            snap.avg_vol_50_excl,
            snap.max_vol_10_excl,
        ),
        VolumeSource::Delivery => (
            snap.bar.delivery_volume as f64,
            snap.avg_dvol_20_excl,
            snap.avg_dvol_50_excl,
            snap.max_dvol_10_excl,
        ),
    }
}

fn evaluate_symbol(
    kind: &ScreenKind,
    snap: &IndicatorSnapshot,
    benchmark_daily: f64,
) -> Option<(RankKey, ScreenRow)> {
    match kind {
        ScreenKind::VolumePattern { source } => volume_pattern(snap, *source),
        ScreenKind::Breakout { direction, source } => breakout(snap, *direction, *source),
        ScreenKind::RelativeWeakness => relative_weakness(snap, benchmark_daily),
    }
}

fn base_row(bar: &DailyBar, change_pct: f64) -> ScreenRow {
    ScreenRow {
        symbol: bar.symbol.clone(),
        date: bar.date,
        close: bar.close,
        change_pct,
        volume: bar.volume,
        delivery_pct: bar.delivery_pct,
        volume_mult: None,
        strength: None,
        relative_return: None,
        close_location: None,
        delivery_mult: None,
    }
}

fn volume_pattern(snap: &IndicatorSnapshot, source: VolumeSource) -> Option<(RankKey, ScreenRow)> {
    let bar = &snap.bar;
    let (vol, _, avg_50, max_10) = source_values(snap, source);
    let high_20 = snap.high_20_excl?;
    let avg_50 = avg_50.filter(|a| *a > 0.0)?;
    let max_10 = max_10?;

    let qualifies = bar.close > high_20
        && vol > avg_50 * VOLUME_EXPLOSION_MULT
        && vol > max_10
        && bar.close > bar.open
        && bar.close > MIN_PRICE;
    if !qualifies || bar.open <= 0.0 {
        return None;
    }

    let mult = round2(vol / avg_50);
    let mut row = base_row(bar, round2((bar.close - bar.open) / bar.open * 100.0));
    row.volume_mult = Some(mult);

    // Raw-volume variant ranks by traded volume; the delivery variant ranks
    // by its multiple. Both descend, so negate into the ascending key.
    let primary = match source {
        VolumeSource::Traded => -(bar.volume as f64),
        VolumeSource::Delivery => -mult,
    };
    Some((RankKey { primary, secondary: 0.0 }, row))
}

fn breakout(
    snap: &IndicatorSnapshot,
    direction: Direction,
    source: VolumeSource,
) -> Option<(RankKey, ScreenRow)> {
    let bar = &snap.bar;
    let change_pct = snap.change_pct?;
    let (vol, avg_20, _, _) = source_values(snap, source);
    let avg_20 = avg_20.filter(|a| *a > 0.0)?;

    let distance = match direction {
        Direction::Upward => {
            let high_20 = snap.high_20_excl?;
            if bar.close <= high_20 {
                return None;
            }
            bar.close - high_20
        }
        Direction::Downward => {
            let low_20 = snap.low_20_excl?;
            if bar.close >= low_20 {
                return None;
            }
            low_20 - bar.close
        }
    };

    let strength = if distance > snap.atr_14 {
        if vol >= avg_20 * STRONG_VOLUME_MULT {
            Strength::Full
        } else {
            Strength::PartialLowVolume
        }
    } else {
        Strength::PartialSmallSize
    };

    let mult = round2(vol / avg_20);
    let mut row = base_row(bar, change_pct);
    row.volume_mult = Some(mult);
    row.strength = Some(strength);

    Some((
        RankKey {
            primary: strength as u8 as f64,
            secondary: mult,
        },
        row,
    ))
}

fn relative_weakness(snap: &IndicatorSnapshot, benchmark_daily: f64) -> Option<(RankKey, ScreenRow)> {
    let bar = &snap.bar;
    let prev_close = bar.prev_close.filter(|pc| *pc > 0.0)?;
    let stock_pct = (bar.close - prev_close) / prev_close * 100.0;
    let relative = stock_pct - benchmark_daily;
    let avg_dvol = snap.avg_dvol_20_excl.filter(|a| *a > 0.0)?;
    let dvol = bar.delivery_volume as f64;

    let qualifies = relative <= RELATIVE_WEAKNESS_MAX
        && snap.close_location <= CLOSE_LOCATION_MAX
        && dvol >= avg_dvol * DELIVERY_SURGE_MULT
        && bar.close > MIN_PRICE;
    if !qualifies {
        return None;
    }

    let delivery_mult = round2(dvol / avg_dvol);
    let mut row = base_row(bar, round2(stock_pct));
    row.relative_return = Some(round2(relative));
    row.close_location = Some(round1(snap.close_location * 100.0));
    row.delivery_mult = Some(delivery_mult);

    Some((
        RankKey {
            primary: relative,
            secondary: delivery_mult,
        },
        row,
    ))
}

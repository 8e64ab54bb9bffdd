//! The screen catalog: named, fixed filter/ranking specifications.
//!
//! Every screen is one of three parametrized shapes; the volume-source
//! selector collapses the raw-volume and delivery-volume variants into a
//! single predicate definition. The catalog is closed — screens are data, not
//! an extensible query language.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Minimum close price; filters out penny stocks everywhere.
pub const MIN_PRICE: f64 = 20.0;
/// Volume must exceed this multiple of its 50-day average to count as an
/// explosion.
pub const VOLUME_EXPLOSION_MULT: f64 = 2.0;
/// Volume at or above this multiple of its 20-day average upgrades a breakout
/// to full strength.
pub const STRONG_VOLUME_MULT: f64 = 1.5;
/// Underperformance bound (percentage points vs the benchmark).
pub const RELATIVE_WEAKNESS_MAX: f64 = -1.2;
/// Close must sit in the bottom 30% of the day's range.
pub const CLOSE_LOCATION_MAX: f64 = 0.30;
/// Delivery volume must reach this multiple of its 20-day average.
pub const DELIVERY_SURGE_MULT: f64 = 1.5;

/// Which volume series a screen reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeSource {
    Traded,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upward,
    Downward,
}

/// Parametrized predicate + ranking shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    /// Bullish candle breaking the 20-day high on an exploding volume series.
    /// Ranked by raw volume (traded) or volume multiple (delivery).
    VolumePattern { source: VolumeSource },
    /// Close beyond the 20-day exclusive extreme, tiered by strength, ranked
    /// strength first then volume multiple.
    Breakout {
        direction: Direction,
        source: VolumeSource,
    },
    /// Underperformance vs the benchmark with a weak close and surging
    /// delivery, ranked by relative return then delivery multiple.
    RelativeWeakness,
}

/// Breakout strength tier. Ordering is the ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    Full,
    PartialLowVolume,
    PartialSmallSize,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Full => write!(f, "Full"),
            Strength::PartialLowVolume => write!(f, "Partial (Low Volume)"),
            Strength::PartialSmallSize => write!(f, "Partial (Small Size)"),
        }
    }
}

impl Serialize for Strength {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One declared output column.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

const fn col(key: &'static str, label: &'static str, kind: &'static str) -> ColumnSpec {
    ColumnSpec { key, label, kind }
}

pub const DEFAULT_COLUMNS: &[ColumnSpec] = &[
    col("symbol", "Symbol", "symbol"),
    col("close", "Price", "currency"),
    col("changePct", "Change %", "percent"),
    col("volumeMult", "Vol Multiple", "multiplier"),
    col("deliveryPct", "Delivery %", "percent"),
    col("date", "Date", "date"),
];

pub const BREAKOUT_COLUMNS: &[ColumnSpec] = &[
    col("symbol", "Symbol", "symbol"),
    col("close", "Price", "currency"),
    col("changePct", "Change %", "percent"),
    col("strength", "Strength", "strength"),
    col("volumeMult", "Vol Multiple", "multiplier"),
    col("deliveryPct", "Delivery %", "percent"),
    col("date", "Date", "date"),
];

pub const WEAKNESS_COLUMNS: &[ColumnSpec] = &[
    col("symbol", "Symbol", "symbol"),
    col("close", "Price", "currency"),
    col("changePct", "Change %", "percent"),
    col("relativeReturn", "Rel. Return", "percent"),
    col("closeLocation", "Close Loc %", "percent"),
    col("deliveryMult", "Del Vol Multiple", "multiplier"),
    col("deliveryPct", "Delivery %", "percent"),
    col("date", "Date", "date"),
];

/// A named screen: identity, presentation and evaluation shape.
#[derive(Debug, Clone, Copy)]
pub struct ScreenSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub kind: ScreenKind,
    pub columns: &'static [ColumnSpec],
}

pub const CATALOG: &[ScreenSpec] = &[
    ScreenSpec {
        id: "volume-breakout",
        title: "Volume Breakout Pattern",
        description: "Bullish breakout with high volume confirmation.",
        kind: ScreenKind::VolumePattern {
            source: VolumeSource::Traded,
        },
        columns: DEFAULT_COLUMNS,
    },
    ScreenSpec {
        id: "upward-breakout",
        title: "Upward Breakout (20D)",
        description: "Price breaks above the highest high of the last 20 days.",
        kind: ScreenKind::Breakout {
            direction: Direction::Upward,
            source: VolumeSource::Traded,
        },
        columns: BREAKOUT_COLUMNS,
    },
    ScreenSpec {
        id: "downward-breakout",
        title: "Downward Breakdown (20D)",
        description: "Price breaks below the lowest low of the last 20 days.",
        kind: ScreenKind::Breakout {
            direction: Direction::Downward,
            source: VolumeSource::Traded,
        },
        columns: BREAKOUT_COLUMNS,
    },
    ScreenSpec {
        id: "volume-breakout-delivery",
        title: "Volume Breakout (Delivery)",
        description: "Bullish breakout based on high delivery volume confirmation.",
        kind: ScreenKind::VolumePattern {
            source: VolumeSource::Delivery,
        },
        columns: DEFAULT_COLUMNS,
    },
    ScreenSpec {
        id: "upward-breakout-delivery",
        title: "Upward Breakout (20D Delivery)",
        description: "Price breaks above 20-day high with high delivery volume.",
        kind: ScreenKind::Breakout {
            direction: Direction::Upward,
            source: VolumeSource::Delivery,
        },
        columns: BREAKOUT_COLUMNS,
    },
    ScreenSpec {
        id: "downward-breakout-delivery",
        title: "Downward Breakdown (20D Delivery)",
        description: "Price breaks below 20-day low with high delivery volume.",
        kind: ScreenKind::Breakout {
            direction: Direction::Downward,
            source: VolumeSource::Delivery,
        },
        columns: BREAKOUT_COLUMNS,
    },
    ScreenSpec {
        id: "relative-weakness",
        title: "Relative Weakness (vs Benchmark)",
        description: "Underperformance vs the benchmark with a weak close and high delivery volume.",
        kind: ScreenKind::RelativeWeakness,
        columns: WEAKNESS_COLUMNS,
    },
];

pub fn find(id: &str) -> Option<&'static ScreenSpec> {
    CATALOG.iter().find(|s| s.id == id)
}

/// One qualifying row. Fields not declared by the screen's columns stay
/// `None` and are skipped on serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub change_pct: f64,
    pub volume: i64,
    pub delivery_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_mult: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<Strength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_location: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_mult: Option<f64>,
}

/// Ordered result set for one evaluation, with the declared output schema.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenOutput {
    pub screen: &'static str,
    pub count: usize,
    pub columns: &'static [ColumnSpec],
    pub results: Vec<ScreenRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_seven_screens() {
        assert_eq!(CATALOG.len(), 7);
    }

    #[test]
    fn find_known_and_unknown_ids() {
        assert!(find("upward-breakout").is_some());
        assert!(find("relative-weakness").is_some());
        assert!(find("no-such-screen").is_none());
    }

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<&str> = CATALOG.iter().map(|s| s.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn strength_orders_full_first() {
        assert!(Strength::Full < Strength::PartialLowVolume);
        assert!(Strength::PartialLowVolume < Strength::PartialSmallSize);
    }

    #[test]
    fn strength_labels() {
        assert_eq!(Strength::Full.to_string(), "Full");
        assert_eq!(
            Strength::PartialLowVolume.to_string(),
            "Partial (Low Volume)"
        );
        assert_eq!(
            Strength::PartialSmallSize.to_string(),
            "Partial (Small Size)"
        );
    }

    #[test]
    fn breakout_screens_declare_strength_column() {
        let spec = find("downward-breakout-delivery").unwrap();
        assert!(spec.columns.iter().any(|c| c.key == "strength"));
        let spec = find("volume-breakout").unwrap();
        assert!(!spec.columns.iter().any(|c| c.key == "strength"));
    }
}

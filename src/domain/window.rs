//! Rolling-window primitives over date-ordered, per-symbol slices.
//!
//! Two window shapes exist, and the distinction is load-bearing:
//!
//! - *inclusive*: the trailing `n` rows ending at the current row
//!   (`i-(n-1) ..= i`). Fewer than `n` rows degenerate to what exists.
//! - *exclusive*: the trailing `n` rows ending the row before the current one
//!   (`i-n ..= i-1`). Empty only at a symbol's first row, where it yields
//!   `None`; otherwise it degenerates to whatever prior rows exist.
//!
//! Breakout predicates compare today's value against exclusive windows so that
//! today can never satisfy its own extreme; smoothing indicators use inclusive
//! windows.

fn incl_start(i: usize, n: usize) -> usize {
    (i + 1).saturating_sub(n)
}

fn excl_start(i: usize, n: usize) -> usize {
    i.saturating_sub(n)
}

/// Mean of the trailing `n` values including index `i`.
pub fn trailing_mean(values: &[f64], i: usize, n: usize) -> f64 {
    let window = &values[incl_start(i, n)..=i];
    window.iter().sum::<f64>() / window.len() as f64
}

/// Max of the trailing `n` values including index `i`.
pub fn trailing_max(values: &[f64], i: usize, n: usize) -> f64 {
    values[incl_start(i, n)..=i]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Mean of the trailing `n` values ending at index `i - 1`.
pub fn trailing_mean_excl(values: &[f64], i: usize, n: usize) -> Option<f64> {
    if i == 0 {
        return None;
    }
    let window = &values[excl_start(i, n)..i];
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// Max of the trailing `n` values ending at index `i - 1`.
pub fn trailing_max_excl(values: &[f64], i: usize, n: usize) -> Option<f64> {
    if i == 0 {
        return None;
    }
    Some(
        values[excl_start(i, n)..i]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max),
    )
}

/// Min of the trailing `n` values ending at index `i - 1`.
pub fn trailing_min_excl(values: &[f64], i: usize, n: usize) -> Option<f64> {
    if i == 0 {
        return None;
    }
    Some(
        values[excl_start(i, n)..i]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min),
    )
}

/// Value `k` rows before index `i`, if that far back exists.
pub fn lookback(values: &[f64], i: usize, k: usize) -> Option<f64> {
    if k > i {
        None
    } else {
        Some(values[i - k])
    }
}

/// Percentage return against a reference value, rounded to 2 decimal places.
/// A missing or non-positive reference yields `None`.
pub fn pct_return(current: f64, reference: Option<f64>) -> Option<f64> {
    match reference {
        Some(r) if r > 0.0 => Some(round2((current - r) / r * 100.0)),
        _ => None,
    }
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const XS: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    #[test]
    fn trailing_mean_full_window() {
        assert_relative_eq!(trailing_mean(&XS, 4, 3), 4.0);
    }

    #[test]
    fn trailing_mean_partial_window() {
        // Only two rows exist before index 1 closes the window.
        assert_relative_eq!(trailing_mean(&XS, 1, 5), 1.5);
    }

    #[test]
    fn trailing_max_inclusive_sees_current() {
        assert_relative_eq!(trailing_max(&XS, 5, 3), 6.0);
    }

    #[test]
    fn exclusive_window_excludes_current() {
        assert_relative_eq!(trailing_max_excl(&XS, 5, 3).unwrap(), 5.0);
        assert_relative_eq!(trailing_min_excl(&XS, 5, 3).unwrap(), 3.0);
        assert_relative_eq!(trailing_mean_excl(&XS, 5, 3).unwrap(), 4.0);
    }

    #[test]
    fn exclusive_window_empty_at_first_row() {
        assert!(trailing_max_excl(&XS, 0, 20).is_none());
        assert!(trailing_min_excl(&XS, 0, 20).is_none());
        assert!(trailing_mean_excl(&XS, 0, 20).is_none());
    }

    #[test]
    fn exclusive_window_degenerates_with_short_history() {
        // At index 2 a 20-row exclusive window is just rows 0..=1.
        assert_relative_eq!(trailing_max_excl(&XS, 2, 20).unwrap(), 2.0);
        assert_relative_eq!(trailing_mean_excl(&XS, 2, 20).unwrap(), 1.5);
    }

    #[test]
    fn lookback_in_and_out_of_range() {
        assert_eq!(lookback(&XS, 5, 2), Some(4.0));
        assert_eq!(lookback(&XS, 5, 5), Some(1.0));
        assert_eq!(lookback(&XS, 5, 6), None);
    }

    #[test]
    fn pct_return_rounds_to_two_places() {
        assert_eq!(pct_return(110.0, Some(100.0)), Some(10.0));
        assert_eq!(pct_return(100.0, Some(30.0)), Some(233.33));
    }

    #[test]
    fn pct_return_rejects_bad_reference() {
        assert_eq!(pct_return(110.0, None), None);
        assert_eq!(pct_return(110.0, Some(0.0)), None);
        assert_eq!(pct_return(110.0, Some(-5.0)), None);
    }
}

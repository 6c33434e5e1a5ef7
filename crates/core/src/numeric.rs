//! Numeric coercion shared by enrichment and scoring. Upstream rows carry
//! whatever the store hands back; everything funnels through these helpers so
//! the enriched view never holds a NaN, an infinity, or a negative
//! price/fee/count.

/// Keep a value only when it is a finite number.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Finite and non-negative. Applies to prices, fees, review counts and ETAs.
pub fn finite_non_negative(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v >= 0.0)
}

/// Null-skipping mean. `None` when no value survives coercion.
pub fn mean_skip_null<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values.into_iter().flat_map(finite) {
        sum += value;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Null-skipping sum for review counts. `None` when every input is null.
pub fn sum_skip_null<I>(values: I) -> Option<i64>
where
    I: IntoIterator<Item = Option<i64>>,
{
    let mut sum = 0i64;
    let mut seen = false;
    for value in values.into_iter().flatten() {
        sum = sum.saturating_add(value.max(0));
        seen = true;
    }
    seen.then_some(sum)
}

/// Nearest-integer rounding into the i64 money/minutes domain.
pub fn round_i64(value: f64) -> i64 {
    value.round() as i64
}

//! Small numeric helpers shared by the indicators.
//!
//! Rolling windows include the current element and are undefined (`None`)
//! until `window` elements are available. Standard deviations are sample
//! (n - 1) deviations.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation, `None` for fewer than two values.
#[must_use]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Sample variance, `None` for fewer than two values.
#[must_use]
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Rolling mean over `window` elements.
#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// Rolling sample standard deviation over `window` elements.
#[must_use]
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

fn rolling(
    values: &[f64],
    window: usize,
    f: impl Fn(&[f64]) -> Option<f64>,
) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                None
            } else {
                f(&values[i + 1 - window..=i])
            }
        })
        .collect()
}

/// Simple returns `x[i] / x[i-1] - 1`; the first element has no return.
///
/// Non-finite results (zero previous price) are reported as `None`.
#[must_use]
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    for pair in values.windows(2) {
        let r = pair[1] / pair[0] - 1.0;
        out.push(r.is_finite().then_some(r));
    }
    out
}

/// Decimal to `f64`, NaN when unrepresentable.
#[must_use]
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Mean of a Decimal slice, `None` for an empty slice.
#[must_use]
pub fn decimal_mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().copied().sum::<Decimal>() / Decimal::from(values.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v).unwrap() - 5.0).abs() < 1e-12);
        // sample variance = 32 / 7
        assert!((sample_variance(&v).unwrap() - 32.0 / 7.0).abs() < 1e-12);
        assert!(sample_std(&[1.0]).is_none());
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn rolling_mean_includes_current_element() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(out, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn rolling_std_waits_for_full_window() {
        let out = rolling_std(&[1.0, 1.0, 1.0, 3.0], 3);
        assert!(out[0].is_none() && out[1].is_none());
        assert_eq!(out[2], Some(0.0));
        assert!(out[3].unwrap() > 0.0);
    }

    #[test]
    fn pct_change_skips_division_by_zero() {
        let out = pct_change(&[100.0, 110.0, 0.0, 5.0]);
        assert_eq!(out[0], None);
        assert!((out[1].unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(out[2], Some(-1.0));
        assert_eq!(out[3], None);
    }

    #[test]
    fn decimal_mean_is_exact() {
        assert_eq!(decimal_mean(&[dec!(1), dec!(2), dec!(4)]).unwrap().round_dp(6), dec!(2.333333));
        assert!(decimal_mean(&[]).is_none());
    }
}

//! Statistical utility functions.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n.is_multiple_of(2) {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Weighted sum `sum(w_i * x_i)`; weights are used as given.
pub fn weighted_sum(values: &[f64], weights: &[f64]) -> f64 {
    values.iter().zip(weights.iter()).map(|(x, w)| x * w).sum()
}

/// Empirical quantile of sorted data with linear interpolation between
/// order statistics.
///
/// Uses `h = (n - 1) * q` and interpolates between `x[floor(h)]` and
/// `x[floor(h) + 1]`.
///
/// # Example
/// ```
/// use quantile_ensembles::utils::stats::empirical_quantile;
///
/// let sorted = [1.0, 2.0, 3.0, 4.0];
/// assert!((empirical_quantile(&sorted, 0.5) - 2.5).abs() < 1e-12);
/// ```
pub fn empirical_quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }

    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    if lo + 1 >= n {
        return sorted[n - 1];
    }
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_median() {
        assert_relative_eq!(mean(&[1.0, 2.0, 6.0]), 3.0, epsilon = 1e-12);
        assert_relative_eq!(median(&[6.0, 1.0, 2.0]), 2.0, epsilon = 1e-12);
        assert_relative_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5, epsilon = 1e-12);
        assert!(mean(&[]).is_nan());
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn weighted_sum_uses_weights_as_given() {
        assert_relative_eq!(
            weighted_sum(&[10.0, 20.0], &[0.25, 0.75]),
            17.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn empirical_quantile_interpolates_order_statistics() {
        let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_relative_eq!(empirical_quantile(&sorted, 0.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(empirical_quantile(&sorted, 1.0), 50.0, epsilon = 1e-12);
        assert_relative_eq!(empirical_quantile(&sorted, 0.5), 30.0, epsilon = 1e-12);
        // h = 4 * 0.1 = 0.4
        assert_relative_eq!(empirical_quantile(&sorted, 0.1), 14.0, epsilon = 1e-12);
    }

    #[test]
    fn empirical_quantile_single_value() {
        assert_relative_eq!(empirical_quantile(&[7.0], 0.3), 7.0, epsilon = 1e-12);
        assert!(empirical_quantile(&[], 0.3).is_nan());
    }
}

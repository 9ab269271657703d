//! Continuous ranked probability score for sample forecasts.

use crate::core::SampleForecast;
use crate::error::{EnsembleError, Result};

/// Sample CRPS `E|X - y| - 0.5 E|X - X'|` under the empirical CDF of the draws.
///
/// Lower is better; zero when every draw equals the observation.
/// The pairwise term is computed from sorted draws in `O(n log n)`.
pub fn crps(forecast: &SampleForecast, observation: f64) -> Result<f64> {
    if forecast.is_empty() {
        return Err(EnsembleError::InsufficientSamples {
            model: forecast.model().to_string(),
            origin_day: forecast.origin_day(),
            target_day: forecast.target_day(),
        });
    }
    if !observation.is_finite() {
        return Err(EnsembleError::MissingValues);
    }
    Ok(crps_sorted(&forecast.sorted_values(), observation))
}

/// CRPS of already sorted draws.
fn crps_sorted(sorted: &[f64], observation: f64) -> f64 {
    let n = sorted.len() as f64;
    let abs_error = sorted.iter().map(|x| (x - observation).abs()).sum::<f64>() / n;

    // sum_{i,j} |x_i - x_j| = 2 * sum_i (2i - n - 1) x_(i), i from 1
    let spread = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (2.0 * (i + 1) as f64 - n - 1.0) * x)
        .sum::<f64>()
        * 2.0
        / (n * n);

    (abs_error - 0.5 * spread).max(0.0)
}

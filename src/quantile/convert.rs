//! Conversion of sample forecasts to quantile forecasts.
//!
//! Each forecast is summarised on its own: the quantiles are marginal
//! per target day and carry no information about joint trajectories.

use tracing::debug;

use crate::core::{QuantileForecast, SampleForecast};
use crate::error::{EnsembleError, Result};
use crate::quantile::QuantileGrid;
use crate::utils::stats::empirical_quantile;

/// Empirical quantiles of one sample forecast at the grid levels.
///
/// # Errors
/// [`EnsembleError::InsufficientSamples`] if the forecast has no draws.
pub fn sample_to_quantile(forecast: &SampleForecast, grid: &QuantileGrid) -> Result<QuantileForecast> {
    if forecast.is_empty() {
        return Err(EnsembleError::InsufficientSamples {
            model: forecast.model().to_string(),
            origin_day: forecast.origin_day(),
            target_day: forecast.target_day(),
        });
    }

    let sorted = forecast.sorted_values();
    let values = grid
        .levels()
        .iter()
        .map(|&q| empirical_quantile(&sorted, q))
        .collect();

    QuantileForecast::new(forecast.key().clone(), grid.levels().to_vec(), values)
}

/// Convert every sample forecast, failing on the first empty group.
pub fn samples_to_quantiles(
    forecasts: &[SampleForecast],
    grid: &QuantileGrid,
) -> Result<Vec<QuantileForecast>> {
    let converted = forecasts
        .iter()
        .map(|f| sample_to_quantile(f, grid))
        .collect::<Result<Vec<_>>>()?;
    debug!(
        forecasts = converted.len(),
        levels = grid.len(),
        "converted sample forecasts to quantiles"
    );
    Ok(converted)
}

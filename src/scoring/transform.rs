//! Log transformation of forecasts and observations.
//!
//! Scoring `ln(x + offset)` instead of `x` measures relative rather than
//! absolute error, so large and small incidence levels count alike.

use crate::core::{Observations, QuantileForecast, SampleForecast};
use crate::error::{EnsembleError, Result};

fn check_offset(offset: f64, min_value: Option<f64>) -> Result<()> {
    let min_value = min_value.unwrap_or(0.0);
    if !offset.is_finite() || offset <= -min_value {
        return Err(EnsembleError::InvalidOffset { offset, min_value });
    }
    Ok(())
}

fn min_of<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    values.reduce(f64::min)
}

/// `ln(x + offset)` applied to observations only.
///
/// # Errors
/// [`EnsembleError::InvalidOffset`] if `offset <= -min(value)`.
pub fn log_transform_observations(observations: &Observations, offset: f64) -> Result<Observations> {
    check_offset(offset, observations.min_value())?;
    observations.map_values(|x| (x + offset).ln())
}

/// `ln(x + offset)` applied to sample draws and observations alike.
///
/// # Errors
/// [`EnsembleError::InvalidOffset`] if `offset <= -min(value)` over all
/// draws and observations.
pub fn log_transform_samples(
    forecasts: &[SampleForecast],
    observations: &Observations,
    offset: f64,
) -> Result<(Vec<SampleForecast>, Observations)> {
    let min_value = min_of(
        forecasts
            .iter()
            .flat_map(|f| f.values())
            .chain(observations.min_value()),
    );
    check_offset(offset, min_value)?;

    let transformed = forecasts
        .iter()
        .map(|f| f.map_values(|x| (x + offset).ln()))
        .collect::<Result<Vec<_>>>()?;
    Ok((transformed, observations.map_values(|x| (x + offset).ln())?))
}

/// `ln(x + offset)` applied to quantile values and observations alike.
///
/// The log is monotone, so quantile ordering is preserved.
///
/// # Errors
/// [`EnsembleError::InvalidOffset`] if `offset <= -min(value)` over all
/// predicted values and observations.
pub fn log_transform_quantiles(
    forecasts: &[QuantileForecast],
    observations: &Observations,
    offset: f64,
) -> Result<(Vec<QuantileForecast>, Observations)> {
    let min_value = min_of(
        forecasts
            .iter()
            .flat_map(|f| f.values().iter().copied())
            .chain(observations.min_value()),
    );
    check_offset(offset, min_value)?;

    let transformed = forecasts
        .iter()
        .map(|f| f.map_values(|x| (x + offset).ln()))
        .collect::<Result<Vec<_>>>()?;
    Ok((transformed, observations.map_values(|x| (x + offset).ln())?))
}

//! Quantile-based scores: pinball loss, weighted interval score, coverage and bias.

use serde::Serialize;

use crate::core::{QuantileForecast, LEVEL_TOLERANCE};
use crate::error::{EnsembleError, Result};

/// Weighted interval score and its decomposition.
///
/// `wis == dispersion + underprediction + overprediction`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WisComponents {
    pub wis: f64,
    pub dispersion: f64,
    pub underprediction: f64,
    pub overprediction: f64,
}

/// Pinball (quantile) loss of predicting `predicted` at level `q`.
pub fn pinball_loss(q: f64, predicted: f64, observed: f64) -> f64 {
    if observed >= predicted {
        q * (observed - predicted)
    } else {
        (1.0 - q) * (predicted - observed)
    }
}

/// Weighted interval score of a quantile forecast.
///
/// Levels are paired into central intervals `(q, 1 - q)` with
/// `alpha = 2q`. Each interval score
/// `(u - l) + 2/alpha (l - y)+ + 2/alpha (y - u)+` is weighted by `alpha / 2`,
/// the absolute error of the median (if level 0.5 is present) by 1/2, and
/// the total is divided by `K + 1/2` (or `K` without a median).
///
/// # Errors
/// [`EnsembleError::InvalidParameter`] if a level has no symmetric partner
/// or the forecast holds neither an interval nor a median.
pub fn weighted_interval_score(forecast: &QuantileForecast, observation: f64) -> Result<WisComponents> {
    if !observation.is_finite() {
        return Err(EnsembleError::MissingValues);
    }

    let mut dispersion = 0.0;
    let mut underprediction = 0.0;
    let mut overprediction = 0.0;
    let mut intervals = 0usize;
    let mut has_median = false;

    for (level, value) in forecast.pairs() {
        if (level - 0.5).abs() < LEVEL_TOLERANCE {
            has_median = true;
            let half_error = 0.5 * (observation - value).abs();
            if value > observation {
                overprediction += half_error;
            } else {
                underprediction += half_error;
            }
            continue;
        }

        let upper = forecast.value_at(1.0 - level).ok_or_else(|| {
            EnsembleError::InvalidParameter(format!(
                "quantile level {} of model '{}' has no symmetric partner",
                level,
                forecast.model()
            ))
        })?;
        if level > 0.5 {
            // Counted from its lower partner
            continue;
        }

        let alpha = 2.0 * level;
        let lower = value;
        intervals += 1;
        dispersion += alpha / 2.0 * (upper - lower);
        overprediction += (lower - observation).max(0.0);
        underprediction += (observation - upper).max(0.0);
    }

    let denominator = intervals as f64 + if has_median { 0.5 } else { 0.0 };
    if denominator == 0.0 {
        return Err(EnsembleError::InvalidParameter(format!(
            "forecast of model '{}' holds no interval and no median",
            forecast.model()
        )));
    }

    let dispersion = dispersion / denominator;
    let underprediction = underprediction / denominator;
    let overprediction = overprediction / denominator;

    Ok(WisComponents {
        wis: dispersion + underprediction + overprediction,
        dispersion,
        underprediction,
        overprediction,
    })
}

/// Mean pinball loss over all levels of a quantile forecast.
pub fn mean_pinball_loss(forecast: &QuantileForecast, observation: f64) -> f64 {
    let total: f64 = forecast
        .pairs()
        .map(|(q, v)| pinball_loss(q, v, observation))
        .sum();
    total / forecast.levels().len() as f64
}

/// Whether the observation lies inside the central `range`% interval.
///
/// # Errors
/// [`EnsembleError::InvalidParameter`] if the interval's levels are not on
/// the forecast's grid or `range` is outside (0, 100).
pub fn interval_coverage(forecast: &QuantileForecast, observation: f64, range: f64) -> Result<bool> {
    if !(range > 0.0 && range < 100.0) {
        return Err(EnsembleError::InvalidParameter(format!(
            "interval range {} outside (0, 100)",
            range
        )));
    }
    let lower_level = (1.0 - range / 100.0) / 2.0;
    let missing = || {
        EnsembleError::InvalidParameter(format!(
            "model '{}' has no {}% interval",
            forecast.model(),
            range
        ))
    };
    let lower = forecast.value_at(lower_level).ok_or_else(missing)?;
    let upper = forecast.value_at(1.0 - lower_level).ok_or_else(missing)?;
    Ok(lower <= observation && observation <= upper)
}

/// Directional bias `1 - 2 F(y)` in [-1, 1].
///
/// `F` interpolates linearly between the forecast's quantiles. Observations
/// below every quantile give 1 (over-prediction), above every quantile -1.
pub fn quantile_bias(forecast: &QuantileForecast, observation: f64) -> f64 {
    let levels = forecast.levels();
    let values = forecast.values();
    let last = values.len() - 1;

    if observation < values[0] {
        return 1.0;
    }
    if observation > values[last] {
        return -1.0;
    }

    let cdf = (0..last)
        .find(|&i| values[i] <= observation && observation <= values[i + 1])
        .map(|i| {
            let width = values[i + 1] - values[i];
            if width == 0.0 {
                (levels[i] + levels[i + 1]) / 2.0
            } else {
                levels[i] + (observation - values[i]) / width * (levels[i + 1] - levels[i])
            }
        })
        .unwrap_or(levels[0]);

    1.0 - 2.0 * cdf
}

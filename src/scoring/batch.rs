//! Scoring whole forecast sets against observations.

use tracing::debug;

use crate::core::{Observations, QuantileForecast, SampleForecast};
use crate::error::Result;
use crate::scoring::crps::crps;
use crate::scoring::interval::{interval_coverage, quantile_bias, weighted_interval_score};
use crate::scoring::{Metric, Scale, Score};
use crate::utils::stats::empirical_quantile;

fn indicator(hit: bool) -> f64 {
    if hit {
        1.0
    } else {
        0.0
    }
}

/// Score sample forecasts with CRPS, median absolute error and bias.
///
/// Forecasts whose target day has no observation are skipped.
pub fn score_samples(
    forecasts: &[SampleForecast],
    observations: &Observations,
    scale: Scale,
) -> Result<Vec<Score>> {
    let mut scores = Vec::with_capacity(forecasts.len());
    let mut skipped = 0usize;

    for forecast in forecasts {
        let Some(observed) = observations.get(forecast.target_day()) else {
            skipped += 1;
            continue;
        };
        let crps_value = crps(forecast, observed)?;

        let sorted = forecast.sorted_values();
        let n = sorted.len() as f64;
        let below = sorted.iter().filter(|&&x| x < observed).count() as f64;
        let at_or_below = sorted.iter().filter(|&&x| x <= observed).count() as f64;
        let median = empirical_quantile(&sorted, 0.5);

        scores.push(
            Score::new(forecast.key().clone(), scale)
                .with_metric(Metric::Crps, crps_value)
                .with_metric(Metric::AbsErrorMedian, (median - observed).abs())
                .with_metric(Metric::Bias, 1.0 - (below + at_or_below) / n),
        );
    }

    if skipped > 0 {
        debug!(skipped, "sample forecasts without observation were not scored");
    }
    Ok(scores)
}

/// Score quantile forecasts with the WIS decomposition, bias, median error
/// and, where the grid allows, 50% and 90% interval coverage.
///
/// Forecasts whose target day has no observation are skipped.
pub fn score_quantiles(
    forecasts: &[QuantileForecast],
    observations: &Observations,
    scale: Scale,
) -> Result<Vec<Score>> {
    let mut scores = Vec::with_capacity(forecasts.len());
    let mut skipped = 0usize;

    for forecast in forecasts {
        let Some(observed) = observations.get(forecast.target_day()) else {
            skipped += 1;
            continue;
        };

        let wis = weighted_interval_score(forecast, observed)?;
        let mut score = Score::new(forecast.key().clone(), scale)
            .with_metric(Metric::Wis, wis.wis)
            .with_metric(Metric::Dispersion, wis.dispersion)
            .with_metric(Metric::Underprediction, wis.underprediction)
            .with_metric(Metric::Overprediction, wis.overprediction)
            .with_metric(Metric::Bias, quantile_bias(forecast, observed));

        if let Some(median) = forecast.median() {
            score = score.with_metric(Metric::AbsErrorMedian, (median - observed).abs());
        }
        if let Ok(hit) = interval_coverage(forecast, observed, 50.0) {
            score = score.with_metric(Metric::Coverage50, indicator(hit));
        }
        if let Ok(hit) = interval_coverage(forecast, observed, 90.0) {
            score = score.with_metric(Metric::Coverage90, indicator(hit));
        }
        scores.push(score);
    }

    if skipped > 0 {
        debug!(skipped, "quantile forecasts without observation were not scored");
    }
    Ok(scores)
}

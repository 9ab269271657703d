//! Probability integral transform (PIT) histograms for calibration checks.
//!
//! A calibrated forecaster yields roughly uniform PIT values. A U shape
//! means overconfident forecasts, a hump underconfident ones, and a
//! skew points to directional bias.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::debug;

use crate::core::{Observations, SampleForecast};
use crate::error::{EnsembleError, Result};
use crate::scoring::metrics::group_key;
use crate::scoring::{GroupValue, ScoreField};

/// Configuration for PIT histograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitConfig {
    /// Number of equal-width bins over [0, 1].
    pub bins: usize,
    /// Fields defining one histogram each.
    pub group_by: Vec<ScoreField>,
    /// Random seed for the tie-breaking draws (None for entropy).
    pub seed: Option<u64>,
}

impl Default for PitConfig {
    fn default() -> Self {
        Self {
            bins: 10,
            group_by: vec![ScoreField::Model],
            seed: None,
        }
    }
}

impl PitConfig {
    /// Create a config with the given number of bins.
    pub fn new(bins: usize) -> Self {
        Self {
            bins,
            ..Default::default()
        }
    }

    /// Set the grouping fields.
    pub fn with_group_by(mut self, fields: Vec<ScoreField>) -> Self {
        self.group_by = fields;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the bin count and grouping fields.
    ///
    /// Sample forecasts carry no scale, so `ScoreField::Scale` cannot
    /// group PIT values.
    pub fn validate(&self) -> Result<()> {
        if self.bins == 0 {
            return Err(EnsembleError::InvalidParameter(
                "PIT histogram needs at least one bin".into(),
            ));
        }
        if self.group_by.contains(&ScoreField::Scale) {
            return Err(EnsembleError::InvalidParameter(
                "PIT histograms cannot be grouped by scale".into(),
            ));
        }
        Ok(())
    }
}

/// One histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitBin {
    /// Bin midpoint.
    pub mid: f64,
    /// Number of PIT values in the bin.
    pub count: usize,
    /// Count scaled so the histogram integrates to one.
    pub density: f64,
}

/// PIT histogram of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitHistogram {
    pub group: Vec<GroupValue>,
    /// Number of forecast/observation pairs.
    pub n: usize,
    pub bins: Vec<PitBin>,
}

/// Chi-squared goodness-of-fit of a histogram against uniformity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UniformityTest {
    pub statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
}

/// Randomised PIT value of an observation under a sample forecast.
///
/// `(#{x < y} + v * #{x == y}) / n` with `v ~ U(0, 1)`, so ties in count
/// data spread uniformly over the jump of the empirical CDF.
pub fn pit_value<R: Rng>(forecast: &SampleForecast, observation: f64, rng: &mut R) -> Result<f64> {
    if forecast.is_empty() {
        return Err(EnsembleError::InsufficientSamples {
            model: forecast.model().to_string(),
            origin_day: forecast.origin_day(),
            target_day: forecast.target_day(),
        });
    }
    let below = forecast.values().filter(|&x| x < observation).count() as f64;
    let equal = forecast.values().filter(|&x| x == observation).count() as f64;
    let v: f64 = rng.gen();
    Ok((below + v * equal) / forecast.len() as f64)
}

/// PIT histograms per group of forecasts with an observed target day.
///
/// Forecasts without observation are skipped. Groups come out in
/// ascending key order.
pub fn pit_histogram(
    forecasts: &[SampleForecast],
    observations: &Observations,
    config: &PitConfig,
) -> Result<Vec<PitHistogram>> {
    config.validate()?;

    let mut rng: StdRng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut groups: BTreeMap<Vec<GroupValue>, Vec<usize>> = BTreeMap::new();
    let mut skipped = 0usize;
    for forecast in forecasts {
        let Some(observed) = observations.get(forecast.target_day()) else {
            skipped += 1;
            continue;
        };
        let u = pit_value(forecast, observed, &mut rng)?;
        let bin = ((u * config.bins as f64) as usize).min(config.bins - 1);

        let counts = groups
            .entry(group_key(&config.group_by, forecast.key(), None)?)
            .or_insert_with(|| vec![0; config.bins]);
        counts[bin] += 1;
    }

    if skipped > 0 {
        debug!(skipped, "forecasts without observation left out of PIT histogram");
    }

    let width = 1.0 / config.bins as f64;
    Ok(groups
        .into_iter()
        .map(|(group, counts)| {
            let n: usize = counts.iter().sum();
            let bins = counts
                .iter()
                .enumerate()
                .map(|(i, &count)| PitBin {
                    mid: (i as f64 + 0.5) * width,
                    count,
                    density: count as f64 / (n as f64 * width),
                })
                .collect();
            PitHistogram { group, n, bins }
        })
        .collect())
}

/// Pearson chi-squared test of a PIT histogram against the uniform distribution.
pub fn pit_uniformity(histogram: &PitHistogram) -> Result<UniformityTest> {
    let k = histogram.bins.len();
    if k < 2 || histogram.n == 0 {
        return Err(EnsembleError::InsufficientData {
            needed: 2,
            got: k.min(histogram.n),
        });
    }

    let expected = histogram.n as f64 / k as f64;
    let statistic = histogram
        .bins
        .iter()
        .map(|b| (b.count as f64 - expected).powi(2) / expected)
        .sum::<f64>();

    let degrees_of_freedom = (k - 1) as f64;
    let dist = ChiSquared::new(degrees_of_freedom)
        .map_err(|e| EnsembleError::ComputationError(e.to_string()))?;

    Ok(UniformityTest {
        statistic,
        degrees_of_freedom,
        p_value: 1.0 - dist.cdf(statistic),
    })
}

//! Performance weights proportional to the inverse of recent scores.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EnsembleError, Result};
use crate::scoring::{Metric, Scale, Score};
use crate::utils::stats::mean;
use crate::weighting::{ModelWeight, ModelWeights, TrainingWindow, WeightGrouping};

/// Share given to models without eligible score history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// `1 / n_models` per unscored model.
    #[default]
    Uniform,
    /// A fixed share per unscored model.
    Fixed(f64),
}

/// Configuration for inverse-error weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverseErrorConfig {
    /// Days between a forecast's origin and the first origin day whose
    /// weights may use its score. Covers the reporting delay of the
    /// observations being scored.
    pub lag: i64,
    /// Extent of score history, counted back from `D - lag`.
    pub window: TrainingWindow,
    /// Score column the weights are based on.
    pub metric: Metric,
    pub fallback: Fallback,
    pub grouping: WeightGrouping,
    /// Floor applied to mean scores before inversion.
    pub min_score: f64,
    /// Only scores on this scale are used.
    pub scale: Scale,
}

impl Default for InverseErrorConfig {
    fn default() -> Self {
        Self {
            lag: 14,
            window: TrainingWindow::Expanding,
            metric: Metric::Wis,
            fallback: Fallback::Uniform,
            grouping: WeightGrouping::Pooled,
            min_score: 1e-10,
            scale: Scale::Natural,
        }
    }
}

impl InverseErrorConfig {
    pub fn with_lag(mut self, lag: i64) -> Self {
        self.lag = lag;
        self
    }

    pub fn with_window(mut self, window: TrainingWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_grouping(mut self, grouping: WeightGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.lag < 0 {
            return Err(EnsembleError::InvalidParameter(format!(
                "lag must be non-negative, got {}",
                self.lag
            )));
        }
        if let TrainingWindow::Rolling(days) = self.window {
            if days < 1 {
                return Err(EnsembleError::InvalidParameter(format!(
                    "rolling window must span at least one day, got {}",
                    days
                )));
            }
        }
        if !self.metric.is_error() {
            return Err(EnsembleError::InvalidParameter(format!(
                "metric {:?} is not a non-negative error",
                self.metric
            )));
        }
        if !(self.min_score > 0.0 && self.min_score.is_finite()) {
            return Err(EnsembleError::InvalidParameter(format!(
                "min_score must be positive, got {}",
                self.min_score
            )));
        }
        if let Fallback::Fixed(share) = self.fallback {
            if !(0.0..=1.0).contains(&share) {
                return Err(EnsembleError::InvalidParameter(format!(
                    "fallback share must lie in [0, 1], got {}",
                    share
                )));
            }
        }
        Ok(())
    }
}

/// Inverse-error weight estimator.
///
/// For origin day `D` each model's weight is proportional to the inverse
/// of its mean score over forecasts that were already evaluable at `D`:
/// the target day is at most `D` and the origin day at most `D - lag`.
///
/// # Example
///
/// ```
/// use quantile_ensembles::core::ForecastKey;
/// use quantile_ensembles::scoring::{Metric, Scale, Score};
/// use quantile_ensembles::weighting::{InverseErrorConfig, InverseErrorWeighting};
///
/// let scores = vec![
///     Score::new(ForecastKey::new("a", 0, 7).unwrap(), Scale::Natural).with_metric(Metric::Wis, 1.0),
///     Score::new(ForecastKey::new("b", 0, 7).unwrap(), Scale::Natural).with_metric(Metric::Wis, 4.0),
/// ];
/// let weights = InverseErrorWeighting::new(InverseErrorConfig::default())
///     .estimate(&scores, &["a", "b"], &[14])
///     .unwrap();
///
/// assert!((weights.lookup("a", 14, 1).unwrap() - 0.8).abs() < 1e-12);
/// assert!((weights.lookup("b", 14, 1).unwrap() - 0.2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InverseErrorWeighting {
    config: InverseErrorConfig,
}

impl InverseErrorWeighting {
    pub fn new(config: InverseErrorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InverseErrorConfig {
        &self.config
    }

    fn is_eligible(&self, score: &Score, origin_day: i64, horizon: Option<i64>) -> bool {
        let latest_origin = origin_day - self.config.lag;
        score.scale == self.config.scale
            && score.target_day() <= origin_day
            && self.config.window.contains(score.origin_day(), latest_origin)
            && horizon.map_or(true, |h| score.horizon() == h)
    }

    /// Weights for every model on every requested origin day.
    ///
    /// Models are weighted jointly per (origin day, horizon group); each
    /// set is non-negative and sums to one.
    pub fn estimate<S: AsRef<str>>(
        &self,
        scores: &[Score],
        models: &[S],
        origin_days: &[i64],
    ) -> Result<ModelWeights> {
        self.config.validate()?;
        let models: BTreeSet<&str> = models.iter().map(|m| m.as_ref()).collect();
        if models.is_empty() {
            return Err(EnsembleError::EmptyData);
        }

        let mut weights = ModelWeights::new();
        let days: BTreeSet<i64> = origin_days.iter().copied().collect();
        for &origin_day in &days {
            for horizon in self.config.grouping.horizons() {
                for (model, weight) in self.weight_set(scores, &models, origin_day, horizon)? {
                    weights.insert(ModelWeight {
                        model: model.to_string(),
                        origin_day,
                        horizon,
                        weight,
                    })?;
                }
            }
        }
        Ok(weights)
    }

    fn weight_set<'m>(
        &self,
        scores: &[Score],
        models: &BTreeSet<&'m str>,
        origin_day: i64,
        horizon: Option<i64>,
    ) -> Result<Vec<(&'m str, f64)>> {
        let n = models.len() as f64;

        // inverse mean score per model, None without history
        let inverse: Vec<(&str, Option<f64>)> = models
            .iter()
            .map(|&model| {
                let history: Vec<f64> = scores
                    .iter()
                    .filter(|s| s.model() == model && self.is_eligible(s, origin_day, horizon))
                    .filter_map(|s| s.get(self.config.metric))
                    .collect();
                let inv = (!history.is_empty())
                    .then(|| 1.0 / mean(&history).max(self.config.min_score));
                (model, inv)
            })
            .collect();

        let unscored: Vec<&str> = inverse
            .iter()
            .filter(|(_, inv)| inv.is_none())
            .map(|(m, _)| *m)
            .collect();

        if unscored.len() == models.len() {
            debug!(origin_day, ?horizon, "no score history, using equal weights");
            return Ok(inverse.into_iter().map(|(m, _)| (m, 1.0 / n)).collect());
        }

        let share = match self.config.fallback {
            Fallback::Uniform => 1.0 / n,
            Fallback::Fixed(share) => share,
        };
        let fallback_total = share * unscored.len() as f64;
        if fallback_total > 1.0 + 1e-12 {
            return Err(EnsembleError::InvalidParameter(format!(
                "fallback share {} for {} models exceeds total weight",
                share,
                unscored.len()
            )));
        }
        if !unscored.is_empty() {
            debug!(origin_day, ?horizon, models = ?unscored, share, "fallback weight");
        }

        let remainder = (1.0 - fallback_total).max(0.0);
        let total_inverse: f64 = inverse.iter().filter_map(|(_, inv)| *inv).sum();
        let set: Vec<(&str, f64)> = inverse
            .into_iter()
            .map(|(m, inv)| match inv {
                Some(inv) => (m, remainder * inv / total_inverse),
                None => (m, share),
            })
            .collect();

        debug!(origin_day, ?horizon, weights = ?set, "inverse-error weights");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ForecastKey;
    use approx::assert_relative_eq;

    fn score(model: &str, origin_day: i64, target_day: i64, wis: f64) -> Score {
        Score::new(ForecastKey::new(model, origin_day, target_day).unwrap(), Scale::Natural)
            .with_metric(Metric::Wis, wis)
    }

    #[test]
    fn weights_are_inverse_to_mean_score() {
        let scores = vec![score("a", 0, 7, 1.0), score("b", 0, 7, 4.0)];
        let weights = InverseErrorWeighting::default()
            .estimate(&scores, &["a", "b"], &[20])
            .unwrap();

        let group = weights.group(20, None);
        assert_relative_eq!(group["a"], 0.8, epsilon = 1e-12);
        assert_relative_eq!(group["b"], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn scores_inside_lag_are_not_used() {
        // origin 10 + lag 14 > 20, so only the origin-0 scores count
        let scores = vec![
            score("a", 0, 7, 1.0),
            score("b", 0, 7, 1.0),
            score("a", 10, 12, 1000.0),
        ];
        let weights = InverseErrorWeighting::default()
            .estimate(&scores, &["a", "b"], &[20])
            .unwrap();
        assert_relative_eq!(weights.lookup("a", 20, 1).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn future_targets_are_not_used() {
        let config = InverseErrorConfig::default().with_lag(0);
        let scores = vec![
            score("a", 0, 7, 1.0),
            score("b", 0, 7, 1.0),
            score("a", 0, 30, 1000.0),
        ];
        let weights = InverseErrorWeighting::new(config)
            .estimate(&scores, &["a", "b"], &[20])
            .unwrap();
        assert_relative_eq!(weights.lookup("a", 20, 5).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn rolling_window_forgets_old_scores() {
        let config = InverseErrorConfig::default()
            .with_lag(0)
            .with_window(TrainingWindow::Rolling(5));
        let scores = vec![
            score("a", 0, 1, 100.0),
            score("a", 18, 19, 1.0),
            score("b", 18, 19, 3.0),
        ];
        let weights = InverseErrorWeighting::new(config)
            .estimate(&scores, &["a", "b"], &[20])
            .unwrap();
        assert_relative_eq!(weights.lookup("a", 20, 1).unwrap(), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn unscored_model_gets_fallback_share() {
        let scores = vec![score("a", 0, 7, 1.0), score("b", 0, 7, 4.0)];

        let uniform = InverseErrorWeighting::default()
            .estimate(&scores, &["a", "b", "new"], &[20])
            .unwrap();
        let group = uniform.group(20, None);
        assert_relative_eq!(group["new"], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(group["a"], 0.8 * 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(group.values().sum::<f64>(), 1.0, epsilon = 1e-12);

        let fixed = InverseErrorWeighting::new(
            InverseErrorConfig::default().with_fallback(Fallback::Fixed(0.1)),
        )
        .estimate(&scores, &["a", "b", "new"], &[20])
        .unwrap();
        assert_relative_eq!(fixed.lookup("new", 20, 1).unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(fixed.lookup("b", 20, 1).unwrap(), 0.18, epsilon = 1e-12);
    }

    #[test]
    fn no_history_gives_equal_weights() {
        let weights = InverseErrorWeighting::default()
            .estimate(&[], &["a", "b", "c", "d"], &[3, 4])
            .unwrap();
        assert_eq!(weights.len(), 8);
        assert!(weights.records().iter().all(|w| w.weight == 0.25));
    }

    #[test]
    fn oversized_fixed_share_is_rejected() {
        let scores = vec![score("a", 0, 7, 1.0)];
        let result = InverseErrorWeighting::new(
            InverseErrorConfig::default().with_fallback(Fallback::Fixed(0.6)),
        )
        .estimate(&scores, &["a", "b", "c"], &[20]);
        assert!(matches!(result, Err(EnsembleError::InvalidParameter(_))));
    }

    #[test]
    fn zero_score_is_floored() {
        let scores = vec![score("a", 0, 7, 0.0), score("b", 0, 7, 1.0)];
        let weights = InverseErrorWeighting::default()
            .estimate(&scores, &["a", "b"], &[20])
            .unwrap();
        let a = weights.lookup("a", 20, 1).unwrap();
        assert!(a.is_finite() && a > 0.999);
    }

    #[test]
    fn per_horizon_weights_use_matching_horizon_only() {
        let config = InverseErrorConfig::default()
            .with_lag(0)
            .with_grouping(WeightGrouping::PerHorizon(vec![1, 7]));
        let scores = vec![
            score("a", 0, 1, 1.0),
            score("b", 0, 1, 3.0),
            score("a", 0, 7, 3.0),
            score("b", 0, 7, 1.0),
        ];
        let weights = InverseErrorWeighting::new(config)
            .estimate(&scores, &["a", "b"], &[10])
            .unwrap();
        assert_relative_eq!(weights.lookup("a", 10, 1).unwrap(), 0.75, epsilon = 1e-12);
        assert_relative_eq!(weights.lookup("a", 10, 7).unwrap(), 0.25, epsilon = 1e-12);
        assert_eq!(weights.lookup("a", 10, 3), None);
    }

    #[test]
    fn signed_and_coverage_metrics_are_rejected() {
        let scores = vec![
            score("a", 0, 7, 1.0).with_metric(Metric::Bias, -0.5),
            score("b", 0, 7, 4.0).with_metric(Metric::Bias, 0.25),
        ];
        for metric in [Metric::Bias, Metric::Coverage50, Metric::Coverage90] {
            let weighting =
                InverseErrorWeighting::new(InverseErrorConfig::default().with_metric(metric));
            assert!(matches!(
                weighting.estimate(&scores, &["a", "b"], &[20]),
                Err(EnsembleError::InvalidParameter(_))
            ));
        }

        let config = InverseErrorConfig::default().with_metric(Metric::AbsErrorMedian);
        let scores = [score("a", 0, 7, 1.0).with_metric(Metric::AbsErrorMedian, 2.0)];
        let weights = InverseErrorWeighting::new(config)
            .estimate(&scores, &["a"], &[20])
            .unwrap();
        assert_relative_eq!(weights.lookup("a", 20, 7).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn scores_on_other_scale_are_ignored() {
        let mut scores = vec![score("a", 0, 7, 1.0), score("b", 0, 7, 4.0)];
        scores.push(
            Score::new(ForecastKey::new("b", 0, 7).unwrap(), Scale::Log)
                .with_metric(Metric::Wis, 0.001),
        );
        let weights = InverseErrorWeighting::default()
            .estimate(&scores, &["a", "b"], &[20])
            .unwrap();
        assert_relative_eq!(weights.lookup("b", 20, 1).unwrap(), 0.2, epsilon = 1e-12);
    }
}

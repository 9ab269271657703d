//! Quantile-level combination of forecasts across models.
//!
//! Forecasts are grouped by (origin day, target day) and combined level by
//! level (a Vincent average), which is well defined whatever the number of
//! draws behind each model.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::QuantileForecast;
use crate::error::{EnsembleError, Result};
use crate::utils::stats::{mean, median, weighted_sum};
use crate::weighting::ModelWeights;

/// Statistic used for unweighted combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Mean across models.
    #[default]
    Mean,
    /// Median across models.
    Median,
}

impl Statistic {
    fn apply(self, values: &[f64]) -> f64 {
        match self {
            Statistic::Mean => mean(values),
            Statistic::Median => median(values),
        }
    }

    /// Default model name of an ensemble built with this statistic.
    pub fn ensemble_name(self) -> &'static str {
        match self {
            Statistic::Mean => "Mean ensemble",
            Statistic::Median => "Median ensemble",
        }
    }
}

/// Default model name of weighted ensembles.
pub const WEIGHTED_ENSEMBLE_NAME: &str = "Weighted ensemble";

/// Forecasts of one (origin day, target day), one per model, sorted by model.
pub(crate) type Group<'a> = Vec<&'a QuantileForecast>;

/// Group forecasts by (origin day, target day) and check each group.
///
/// Every model may appear once per group and all members must share the
/// quantile levels of the first member.
pub(crate) fn group_by_target(
    forecasts: &[QuantileForecast],
) -> Result<BTreeMap<(i64, i64), Group<'_>>> {
    let mut groups: BTreeMap<(i64, i64), Group<'_>> = BTreeMap::new();
    for f in forecasts {
        groups
            .entry((f.origin_day(), f.target_day()))
            .or_default()
            .push(f);
    }

    for members in groups.values_mut() {
        members.sort_by(|a, b| a.model().cmp(b.model()));
        check_group(members)?;
    }

    Ok(groups)
}

fn check_group(members: &[&QuantileForecast]) -> Result<()> {
    let Some(first) = members.first() else {
        return Ok(());
    };
    for w in members.windows(2) {
        if w[0].model() == w[1].model() {
            return Err(EnsembleError::DuplicateEntry(format!(
                "model '{}' forecasts origin day {} target day {} twice",
                w[1].model(),
                w[1].origin_day(),
                w[1].target_day()
            )));
        }
    }
    for f in members.iter().skip(1) {
        if !f.same_grid(first) {
            return Err(EnsembleError::IncompatibleQuantileGrid {
                model: f.model().to_string(),
                expected: first.levels().to_vec(),
                got: f.levels().to_vec(),
            });
        }
    }
    Ok(())
}

/// Combine one group level by level with the given coefficients.
///
/// Coefficients are used as given; any normalisation happens in the caller.
pub(crate) fn combine_with_coefficients(
    members: &[&QuantileForecast],
    coefficients: &[f64],
    name: &str,
) -> Result<QuantileForecast> {
    let first = members.first().ok_or(EnsembleError::EmptyData)?;
    if coefficients.len() != members.len() {
        return Err(EnsembleError::DimensionMismatch {
            expected: members.len(),
            got: coefficients.len(),
        });
    }

    let values = (0..first.levels().len())
        .map(|i| {
            let column: Vec<f64> = members.iter().map(|m| m.values()[i]).collect();
            weighted_sum(&column, coefficients)
        })
        .collect();

    QuantileForecast::new(first.key().with_model(name), first.levels().to_vec(), values)
}

fn combine_with_statistic(
    members: &[&QuantileForecast],
    statistic: Statistic,
    name: &str,
) -> Result<QuantileForecast> {
    let first = members.first().ok_or(EnsembleError::EmptyData)?;
    let values = (0..first.levels().len())
        .map(|i| {
            let column: Vec<f64> = members.iter().map(|m| m.values()[i]).collect();
            statistic.apply(&column)
        })
        .collect();

    QuantileForecast::new(first.key().with_model(name), first.levels().to_vec(), values)
}

/// Builds ensemble forecasts from per-model quantile forecasts.
#[derive(Debug, Clone, Default)]
pub struct EnsembleCombiner {
    name: Option<String>,
}

impl EnsembleCombiner {
    /// Create a combiner that names its output after the combination method.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed model name for every produced ensemble.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(default)
    }

    /// Mean or median across all models, per group and quantile level.
    pub fn unweighted(
        &self,
        forecasts: &[QuantileForecast],
        statistic: Statistic,
    ) -> Result<Vec<QuantileForecast>> {
        let groups = group_by_target(forecasts)?;
        let name = self.name_or(statistic.ensemble_name());

        let combined = groups
            .values()
            .map(|members| combine_with_statistic(members, statistic, name))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            groups = combined.len(),
            statistic = ?statistic,
            "combined forecasts without weights"
        );
        Ok(combined)
    }

    /// Like [`EnsembleCombiner::unweighted`] after dropping the excluded models.
    ///
    /// The exclusion list must be fixed in advance; choosing members from
    /// outcomes of the evaluation period biases any later comparison.
    pub fn filtered<S: AsRef<str>>(
        &self,
        forecasts: &[QuantileForecast],
        exclude_models: &[S],
        statistic: Statistic,
    ) -> Result<Vec<QuantileForecast>> {
        let excluded: HashSet<&str> = exclude_models.iter().map(|m| m.as_ref()).collect();
        let present: HashSet<&str> = forecasts.iter().map(|f| f.model()).collect();
        for unknown in excluded.difference(&present) {
            debug!(model = *unknown, "excluded model has no forecasts");
        }

        let kept: Vec<QuantileForecast> = forecasts
            .iter()
            .filter(|f| !excluded.contains(f.model()))
            .cloned()
            .collect();
        self.unweighted(&kept, statistic)
    }

    /// Weighted sum across models, per group and quantile level.
    ///
    /// Weights of the models present in a group are renormalised to sum
    /// to one. Every model needs a weight for its group; no default is
    /// substituted.
    pub fn weighted(
        &self,
        forecasts: &[QuantileForecast],
        weights: &ModelWeights,
    ) -> Result<Vec<QuantileForecast>> {
        let groups = group_by_target(forecasts)?;
        let name = self.name_or(WEIGHTED_ENSEMBLE_NAME);

        let mut combined = Vec::with_capacity(groups.len());
        for (&(origin_day, target_day), members) in &groups {
            let horizon = target_day - origin_day;
            let raw = members
                .iter()
                .map(|m| {
                    let w = weights.lookup(m.model(), origin_day, horizon).ok_or_else(|| {
                        EnsembleError::MissingWeight {
                            model: m.model().to_string(),
                            origin_day,
                            horizon,
                        }
                    })?;
                    if w < 0.0 {
                        return Err(EnsembleError::InvalidParameter(format!(
                            "negative weight {} for model '{}'",
                            w,
                            m.model()
                        )));
                    }
                    Ok(w)
                })
                .collect::<Result<Vec<f64>>>()?;

            let total: f64 = raw.iter().sum();
            if total <= 0.0 {
                return Err(EnsembleError::ComputationError(format!(
                    "weights sum to zero at origin day {} horizon {}",
                    origin_day, horizon
                )));
            }
            let normalised: Vec<f64> = raw.iter().map(|w| w / total).collect();
            combined.push(combine_with_coefficients(members, &normalised, name)?);
        }

        debug!(groups = combined.len(), "combined forecasts with weights");
        Ok(combined)
    }
}

/// Unweighted ensemble with the default name for `statistic`.
pub fn unweighted_combine(
    forecasts: &[QuantileForecast],
    statistic: Statistic,
) -> Result<Vec<QuantileForecast>> {
    EnsembleCombiner::new().unweighted(forecasts, statistic)
}

/// Unweighted ensemble of every model not listed in `exclude_models`.
pub fn filtered_combine<S: AsRef<str>>(
    forecasts: &[QuantileForecast],
    exclude_models: &[S],
    statistic: Statistic,
) -> Result<Vec<QuantileForecast>> {
    EnsembleCombiner::new().filtered(forecasts, exclude_models, statistic)
}

/// Weighted ensemble named "Weighted ensemble".
pub fn weighted_combine(
    forecasts: &[QuantileForecast],
    weights: &ModelWeights,
) -> Result<Vec<QuantileForecast>> {
    EnsembleCombiner::new().weighted(forecasts, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ForecastKey;
    use crate::weighting::ModelWeight;
    use approx::assert_relative_eq;

    const LEVELS: [f64; 3] = [0.1, 0.5, 0.9];

    fn qf(model: &str, origin_day: i64, target_day: i64, values: [f64; 3]) -> QuantileForecast {
        QuantileForecast::new(
            ForecastKey::new(model, origin_day, target_day).unwrap(),
            LEVELS.to_vec(),
            values.to_vec(),
        )
        .unwrap()
    }

    fn three_models() -> Vec<QuantileForecast> {
        vec![
            qf("a", 10, 12, [1.0, 2.0, 3.0]),
            qf("b", 10, 12, [2.0, 4.0, 9.0]),
            qf("c", 10, 12, [3.0, 9.0, 12.0]),
            qf("a", 10, 13, [1.0, 1.0, 1.0]),
        ]
    }

    #[test]
    fn mean_ensemble_per_group() {
        let out = unweighted_combine(&three_models(), Statistic::Mean).unwrap();
        assert_eq!(out.len(), 2);

        let day12 = &out[0];
        assert_eq!(day12.model(), "Mean ensemble");
        assert_eq!(day12.target_day(), 12);
        assert_relative_eq!(day12.values()[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(day12.values()[1], 5.0, epsilon = 1e-12);
        assert_relative_eq!(day12.values()[2], 8.0, epsilon = 1e-12);

        // Single-member group is unchanged
        assert_eq!(out[1].values(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn median_ensemble_per_group() {
        let out = unweighted_combine(&three_models(), Statistic::Median).unwrap();
        assert_eq!(out[0].model(), "Median ensemble");
        assert_eq!(out[0].values(), &[2.0, 4.0, 9.0]);
    }

    #[test]
    fn combiner_uses_custom_name() {
        let out = EnsembleCombiner::new()
            .with_name("All models")
            .unweighted(&three_models(), Statistic::Mean)
            .unwrap();
        assert!(out.iter().all(|f| f.model() == "All models"));
    }

    #[test]
    fn incompatible_grids_are_rejected() {
        let mut forecasts = three_models();
        forecasts.push(
            QuantileForecast::new(
                ForecastKey::new("d", 10, 12).unwrap(),
                vec![0.25, 0.5, 0.75],
                vec![1.0, 2.0, 3.0],
            )
            .unwrap(),
        );
        assert!(matches!(
            unweighted_combine(&forecasts, Statistic::Mean),
            Err(EnsembleError::IncompatibleQuantileGrid { .. })
        ));
    }

    #[test]
    fn duplicate_model_in_group_is_rejected() {
        let mut forecasts = three_models();
        forecasts.push(qf("a", 10, 12, [0.0, 0.0, 0.0]));
        assert!(matches!(
            unweighted_combine(&forecasts, Statistic::Mean),
            Err(EnsembleError::DuplicateEntry(_))
        ));
    }

    #[test]
    fn filtered_ensemble_drops_excluded_models() {
        let out = filtered_combine(&three_models(), &["c", "unknown"], Statistic::Mean).unwrap();
        assert_relative_eq!(out[0].values()[1], 3.0, epsilon = 1e-12);

        // Excluding the only model of a group removes that group
        let out = filtered_combine(&three_models(), &["a"], Statistic::Mean).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn weighted_ensemble_normalises_weights() {
        let forecasts = vec![qf("a", 10, 12, [0.0, 0.0, 0.0]), qf("b", 10, 12, [4.0, 8.0, 12.0])];
        let weights = ModelWeights::from_entries(vec![
            ModelWeight {
                model: "a".into(),
                origin_day: 10,
                horizon: None,
                weight: 3.0,
            },
            ModelWeight {
                model: "b".into(),
                origin_day: 10,
                horizon: None,
                weight: 1.0,
            },
        ])
        .unwrap();

        let out = weighted_combine(&forecasts, &weights).unwrap();
        assert_eq!(out[0].model(), "Weighted ensemble");
        assert_relative_eq!(out[0].values()[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[0].values()[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(out[0].values()[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn weighted_ensemble_requires_every_weight() {
        let weights = ModelWeights::uniform(&["a", "b"], &[10]);
        let result = weighted_combine(&three_models(), &weights);
        assert_eq!(
            result,
            Err(EnsembleError::MissingWeight {
                model: "c".to_string(),
                origin_day: 10,
                horizon: 2,
            })
        );
    }

    #[test]
    fn weighted_ensemble_rejects_negative_weights() {
        let forecasts = vec![qf("a", 10, 12, [1.0, 2.0, 3.0])];
        let weights = ModelWeights::from_entries(vec![ModelWeight {
            model: "a".into(),
            origin_day: 10,
            horizon: None,
            weight: -1.0,
        }])
        .unwrap();
        assert!(matches!(
            weighted_combine(&forecasts, &weights),
            Err(EnsembleError::InvalidParameter(_))
        ));
    }

    #[test]
    fn uniform_weights_match_mean_ensemble() {
        let forecasts = three_models();
        let weights = ModelWeights::uniform(&["a", "b", "c"], &[10]);
        let weighted = weighted_combine(&forecasts, &weights).unwrap();
        let mean = unweighted_combine(&forecasts, Statistic::Mean).unwrap();
        for (w, m) in weighted.iter().zip(mean.iter()) {
            for (x, y) in w.values().iter().zip(m.values().iter()) {
                assert_relative_eq!(x, y, epsilon = 1e-12);
            }
        }
    }
}

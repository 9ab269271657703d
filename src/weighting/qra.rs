//! Quantile regression averaging (QRA).
//!
//! Combination coefficients for origin day `D` are fit on past forecasts
//! whose targets have been observed by `D`, then applied to the forecasts
//! made on `D`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Observations, QuantileForecast};
use crate::ensemble::{combine_with_coefficients, group_by_target};
use crate::error::{EnsembleError, Result};
use crate::weighting::{
    Constraint, ModelWeight, ModelWeights, NelderMeadSolver, Objective, ProjectedGradientSolver,
    QraPoint, QraProblem, TrainingWindow, WeightGrouping, WeightSolver,
};

/// Default model name of QRA ensembles.
pub const QRA_ENSEMBLE_NAME: &str = "QRA ensemble";

/// Solver selection for [`QraConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QraSolver {
    NelderMead(NelderMeadSolver),
    ProjectedGradient(ProjectedGradientSolver),
}

impl Default for QraSolver {
    fn default() -> Self {
        QraSolver::NelderMead(NelderMeadSolver::default())
    }
}

impl QraSolver {
    fn build(&self) -> Box<dyn WeightSolver> {
        match self {
            QraSolver::NelderMead(s) => Box::new(s.clone()),
            QraSolver::ProjectedGradient(s) => Box::new(s.clone()),
        }
    }
}

/// Configuration for quantile regression averaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QraConfig {
    /// Origin days of the training forecasts, counted back from `D`.
    pub window: TrainingWindow,
    pub grouping: WeightGrouping,
    pub constraint: Constraint,
    /// Minimum number of training forecasts per weight set. At least one
    /// per model is always required.
    pub min_pairs: usize,
    pub objective: Objective,
    pub solver: QraSolver,
}

impl Default for QraConfig {
    fn default() -> Self {
        Self {
            window: TrainingWindow::Rolling(21),
            grouping: WeightGrouping::Pooled,
            constraint: Constraint::Simplex,
            min_pairs: 1,
            objective: Objective::Pinball,
            solver: QraSolver::default(),
        }
    }
}

impl QraConfig {
    pub fn with_window(mut self, window: TrainingWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_grouping(mut self, grouping: WeightGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn with_min_pairs(mut self, min_pairs: usize) -> Self {
        self.min_pairs = min_pairs;
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_solver(mut self, solver: QraSolver) -> Self {
        self.solver = solver;
        self
    }
}

/// Weights and ensemble forecasts produced by [`QuantileRegressionAveraging::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct QraResult {
    pub weights: ModelWeights,
    /// Combined forecasts made on the fitted origin days.
    pub ensemble: Vec<QuantileForecast>,
}

/// Regression-based ensemble weighting.
#[derive(Debug)]
pub struct QuantileRegressionAveraging {
    config: QraConfig,
    solver: Box<dyn WeightSolver>,
    name: String,
}

impl Default for QuantileRegressionAveraging {
    fn default() -> Self {
        Self::new(QraConfig::default())
    }
}

impl QuantileRegressionAveraging {
    pub fn new(config: QraConfig) -> Self {
        let solver = config.solver.build();
        Self {
            config,
            solver,
            name: QRA_ENSEMBLE_NAME.to_string(),
        }
    }

    /// Replace the configured solver with a custom one.
    pub fn with_solver(mut self, solver: Box<dyn WeightSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Model name of the produced ensemble forecasts.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(&self) -> &QraConfig {
        &self.config
    }

    /// Fit one weight set per origin day (and horizon, if grouped) and
    /// combine the forecasts made on those days.
    ///
    /// A training row for `D` is a past (origin day, target day) inside the
    /// window whose target was observed by `D`. The models weighted at `D`
    /// are those appearing in these rows, so a model whose forecasts all
    /// target days after `D` never enters the fit. Rows lacking one of the
    /// weighted models are skipped. Forecasts made on `D` by a model
    /// without a weight are left out of the ensemble.
    ///
    /// # Errors
    /// - [`EnsembleError::InsufficientTrainingData`] if fewer than
    ///   `max(min_pairs, n_models)` complete rows are available for a
    ///   weight set.
    /// - [`EnsembleError::CrossingQuantiles`] if unconstrained
    ///   coefficients produce a decreasing ensemble forecast.
    pub fn fit(
        &self,
        forecasts: &[QuantileForecast],
        observations: &Observations,
        origin_days: &[i64],
    ) -> Result<QraResult> {
        if let TrainingWindow::Rolling(days) = self.config.window {
            if days < 1 {
                return Err(EnsembleError::InvalidParameter(format!(
                    "rolling window must span at least one day, got {}",
                    days
                )));
            }
        }
        if forecasts.is_empty() {
            return Err(EnsembleError::EmptyData);
        }

        let groups = group_by_target(forecasts)?;
        let mut weights = ModelWeights::new();
        let mut ensemble = Vec::new();
        let days: BTreeSet<i64> = origin_days.iter().copied().collect();

        for &origin_day in &days {
            for horizon in self.config.grouping.horizons() {
                let in_horizon = |o: i64, t: i64| horizon.map_or(true, |h| t - o == h);

                let mut unobserved = 0usize;
                let mut training = Vec::new();
                for (&(o, t), members) in &groups {
                    let eligible = t <= origin_day
                        && self.config.window.contains(o, origin_day)
                        && in_horizon(o, t);
                    if !eligible {
                        continue;
                    }
                    match observations.get(t) {
                        Some(observed) => training.push((members, observed)),
                        None => unobserved += 1,
                    }
                }

                let models: Vec<&str> = training
                    .iter()
                    .flat_map(|(members, _)| members.iter().map(|m| m.model()))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                let needed = self.config.min_pairs.max(models.len()).max(1);

                let mut problem = QraProblem::new(models.len());
                let mut rows = 0usize;
                let mut incomplete = 0usize;
                for (members, observed) in &training {
                    // members are sorted by model and drawn from `models`
                    if members.len() != models.len() {
                        incomplete += 1;
                        continue;
                    }
                    for (i, &level) in members[0].levels().iter().enumerate() {
                        problem.push(QraPoint {
                            level,
                            predictions: members.iter().map(|m| m.values()[i]).collect(),
                            observation: *observed,
                        })?;
                    }
                    rows += 1;
                }

                if unobserved + incomplete > 0 {
                    debug!(
                        origin_day,
                        ?horizon,
                        unobserved,
                        incomplete,
                        "skipped training rows"
                    );
                }
                if rows < needed {
                    return Err(EnsembleError::InsufficientTrainingData {
                        origin_day,
                        needed,
                        got: rows,
                    });
                }

                let coefficients = self.solver.solve(
                    &problem,
                    self.config.objective,
                    self.config.constraint,
                )?;
                debug!(
                    origin_day,
                    ?horizon,
                    rows,
                    solver = self.solver.name(),
                    coefficients = ?coefficients,
                    "fitted QRA weights"
                );

                for (model, &weight) in models.iter().zip(&coefficients) {
                    weights.insert(ModelWeight {
                        model: model.to_string(),
                        origin_day,
                        horizon,
                        weight,
                    })?;
                }

                for (_, members) in groups
                    .range((origin_day, i64::MIN)..=(origin_day, i64::MAX))
                    .filter(|((o, t), _)| in_horizon(*o, *t))
                {
                    if let Some(combined) = self.combine(members, &models, &coefficients)? {
                        ensemble.push(combined);
                    }
                }
            }
        }

        Ok(QraResult { weights, ensemble })
    }

    /// Combine one forecast group with the fitted coefficients.
    ///
    /// Members from models without a weight are dropped; `None` if none
    /// remain. Under the simplex constraint a group lacking some weighted
    /// models uses the renormalised weights of the models present;
    /// unconstrained coefficients need every weighted model.
    fn combine(
        &self,
        members: &[&QuantileForecast],
        models: &[&str],
        coefficients: &[f64],
    ) -> Result<Option<QuantileForecast>> {
        let mut kept = Vec::with_capacity(members.len());
        let mut selected = Vec::with_capacity(members.len());
        for &m in members {
            match models.binary_search(&m.model()) {
                Ok(idx) => {
                    kept.push(m);
                    selected.push(coefficients[idx]);
                }
                Err(_) => {
                    debug!(
                        model = m.model(),
                        origin_day = m.origin_day(),
                        target_day = m.target_day(),
                        "no QRA weight for model, left out of the ensemble"
                    );
                }
            }
        }
        let members = kept;
        if members.is_empty() {
            return Ok(None);
        }

        if members.len() != models.len() {
            match self.config.constraint {
                Constraint::Unconstrained => {
                    return Err(EnsembleError::DimensionMismatch {
                        expected: models.len(),
                        got: members.len(),
                    })
                }
                Constraint::Simplex => {
                    let total: f64 = selected.iter().sum();
                    if total <= 0.0 {
                        return Err(EnsembleError::ComputationError(format!(
                            "weights of the models forecasting origin day {} sum to zero",
                            members[0].origin_day()
                        )));
                    }
                    selected.iter_mut().for_each(|w| *w /= total);
                }
            }
        }

        combine_with_coefficients(&members, &selected, &self.name).map(Some)
    }
}

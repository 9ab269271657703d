//! Optimisers for regression-based combination weights.
//!
//! A [`QraProblem`] holds one point per (training forecast, quantile
//! level): the level, every model's predicted value and the observation.
//! A [`WeightSolver`] finds the coefficients minimising the chosen
//! [`Objective`] under the chosen [`Constraint`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EnsembleError, Result};
use crate::scoring::pinball_loss;
use crate::utils::ols::ols_fit;
use crate::utils::optimization::{
    nelder_mead, project_to_simplex, softmax_weights, NelderMeadConfig,
};
use crate::utils::stats::weighted_sum;

/// Loss minimised by the combination coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Summed pinball loss of the combined quantiles (quantile regression averaging).
    #[default]
    Pinball,
    /// Summed squared error of the combined quantiles against the observation.
    LeastSquares,
}

/// Feasible set of the combination coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Non-negative and summing to one.
    #[default]
    Simplex,
    /// Any real coefficients.
    Unconstrained,
}

/// One quantile level of one training forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct QraPoint {
    pub level: f64,
    /// Predicted value of each model, in model order.
    pub predictions: Vec<f64>,
    pub observation: f64,
}

/// Training data of one weight set.
#[derive(Debug, Clone, PartialEq)]
pub struct QraProblem {
    n_models: usize,
    points: Vec<QraPoint>,
}

impl QraProblem {
    pub fn new(n_models: usize) -> Self {
        Self {
            n_models,
            points: Vec::new(),
        }
    }

    /// Add a point; it must carry one prediction per model.
    pub fn push(&mut self, point: QraPoint) -> Result<()> {
        if point.predictions.len() != self.n_models {
            return Err(EnsembleError::DimensionMismatch {
                expected: self.n_models,
                got: point.predictions.len(),
            });
        }
        self.points.push(point);
        Ok(())
    }

    pub fn n_models(&self) -> usize {
        self.n_models
    }

    pub fn points(&self) -> &[QraPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Objective value of the given coefficients.
    pub fn loss(&self, coefficients: &[f64], objective: Objective) -> f64 {
        self.points
            .iter()
            .map(|p| {
                let combined = weighted_sum(&p.predictions, coefficients);
                match objective {
                    Objective::Pinball => pinball_loss(p.level, combined, p.observation),
                    Objective::LeastSquares => (combined - p.observation).powi(2),
                }
            })
            .sum()
    }

    fn check(&self) -> Result<()> {
        if self.n_models == 0 || self.points.is_empty() {
            return Err(EnsembleError::EmptyData);
        }
        Ok(())
    }
}

/// Finds combination coefficients for a [`QraProblem`].
pub trait WeightSolver: std::fmt::Debug {
    /// Solve for one coefficient per model.
    fn solve(
        &self,
        problem: &QraProblem,
        objective: Objective,
        constraint: Constraint,
    ) -> Result<Vec<f64>>;

    /// Solver name for logs.
    fn name(&self) -> &str;
}

/// Derivative-free solver for either objective.
///
/// Simplex constraints are enforced through a softmax over `n - 1` free
/// parameters, so every candidate is feasible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadSolver {
    pub config: NelderMeadConfig,
}

impl NelderMeadSolver {
    pub fn new(config: NelderMeadConfig) -> Self {
        Self { config }
    }
}

impl WeightSolver for NelderMeadSolver {
    fn solve(
        &self,
        problem: &QraProblem,
        objective: Objective,
        constraint: Constraint,
    ) -> Result<Vec<f64>> {
        problem.check()?;
        let n = problem.n_models();

        let (coefficients, converged) = match constraint {
            Constraint::Simplex if n == 1 => (vec![1.0], true),
            Constraint::Simplex => {
                let result = nelder_mead(
                    |free| problem.loss(&softmax_weights(free), objective),
                    &vec![0.0; n - 1],
                    &self.config,
                );
                (softmax_weights(&result.optimal_point), result.converged)
            }
            Constraint::Unconstrained => {
                let result = nelder_mead(
                    |w| problem.loss(w, objective),
                    &vec![1.0 / n as f64; n],
                    &self.config,
                );
                (result.optimal_point, result.converged)
            }
        };

        if !converged {
            warn!(
                solver = self.name(),
                max_iter = self.config.max_iter,
                "weight optimisation did not converge"
            );
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(EnsembleError::ComputationError(
                "weight optimisation produced non-finite coefficients".into(),
            ));
        }
        Ok(coefficients)
    }

    fn name(&self) -> &str {
        "nelder-mead"
    }
}

/// Least-squares solver.
///
/// Projected gradient descent onto the probability simplex, or the
/// normal equations when unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectedGradientSolver {
    pub max_iter: usize,
    /// Stop once no coefficient moves more than this in one step.
    pub tolerance: f64,
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            tolerance: 1e-10,
        }
    }
}

impl ProjectedGradientSolver {
    pub fn new(max_iter: usize, tolerance: f64) -> Self {
        Self {
            max_iter,
            tolerance,
        }
    }

    fn solve_simplex(&self, problem: &QraProblem) -> Vec<f64> {
        let n = problem.n_models();

        // Lipschitz constant of the gradient, bounded by 2 * trace(X'X)
        let lipschitz = 2.0
            * problem
                .points()
                .iter()
                .flat_map(|p| p.predictions.iter())
                .map(|x| x * x)
                .sum::<f64>();
        if lipschitz <= 0.0 {
            return vec![1.0 / n as f64; n];
        }
        let step = 1.0 / lipschitz;

        let mut w = vec![1.0 / n as f64; n];
        for _ in 0..self.max_iter {
            let mut gradient = vec![0.0; n];
            for p in problem.points() {
                let residual = weighted_sum(&p.predictions, &w) - p.observation;
                for (g, x) in gradient.iter_mut().zip(&p.predictions) {
                    *g += 2.0 * residual * x;
                }
            }

            let candidate: Vec<f64> = w
                .iter()
                .zip(&gradient)
                .map(|(wi, gi)| wi - step * gi)
                .collect();
            let next = project_to_simplex(&candidate);
            let moved = next
                .iter()
                .zip(&w)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            w = next;
            if moved < self.tolerance {
                return w;
            }
        }

        warn!(
            solver = self.name(),
            max_iter = self.max_iter,
            "weight optimisation did not converge"
        );
        w
    }
}

impl WeightSolver for ProjectedGradientSolver {
    fn solve(
        &self,
        problem: &QraProblem,
        objective: Objective,
        constraint: Constraint,
    ) -> Result<Vec<f64>> {
        if objective != Objective::LeastSquares {
            return Err(EnsembleError::InvalidParameter(
                "projected gradient solver supports the least-squares objective only".into(),
            ));
        }
        problem.check()?;

        match constraint {
            Constraint::Simplex => Ok(self.solve_simplex(problem)),
            Constraint::Unconstrained => {
                let y: Vec<f64> = problem.points().iter().map(|p| p.observation).collect();
                let columns: Vec<Vec<f64>> = (0..problem.n_models())
                    .map(|m| problem.points().iter().map(|p| p.predictions[m]).collect())
                    .collect();
                ols_fit(&y, &columns)
            }
        }
    }

    fn name(&self) -> &str {
        "projected-gradient"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Model 0 is exact, model 1 is biased upwards by 10.
    fn problem() -> QraProblem {
        let mut problem = QraProblem::new(2);
        for (i, y) in [5.0, 8.0, 13.0, 9.0, 4.0, 11.0].iter().enumerate() {
            for level in [0.25, 0.5, 0.75] {
                let spread = (level - 0.5) * 2.0;
                problem
                    .push(QraPoint {
                        level,
                        predictions: vec![y + spread, y + 10.0 + spread + i as f64 * 0.1],
                        observation: *y,
                    })
                    .unwrap();
            }
        }
        problem
    }

    #[test]
    fn push_checks_dimension() {
        let mut problem = QraProblem::new(3);
        let result = problem.push(QraPoint {
            level: 0.5,
            predictions: vec![1.0, 2.0],
            observation: 1.0,
        });
        assert!(matches!(
            result,
            Err(EnsembleError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn loss_of_exact_predictions_is_zero() {
        let mut problem = QraProblem::new(1);
        problem
            .push(QraPoint {
                level: 0.5,
                predictions: vec![3.0],
                observation: 3.0,
            })
            .unwrap();
        assert_eq!(problem.loss(&[1.0], Objective::Pinball), 0.0);
        assert_eq!(problem.loss(&[2.0], Objective::LeastSquares), 9.0);
    }

    #[test]
    fn nelder_mead_simplex_favours_accurate_model() {
        let solver = NelderMeadSolver::default();
        for objective in [Objective::Pinball, Objective::LeastSquares] {
            let w = solver
                .solve(&problem(), objective, Constraint::Simplex)
                .unwrap();
            assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert!(w.iter().all(|&x| x >= 0.0));
            assert!(w[0] > 0.9, "{:?}", w);
        }
    }

    #[test]
    fn projected_gradient_stays_on_simplex() {
        let w = ProjectedGradientSolver::default()
            .solve(&problem(), Objective::LeastSquares, Constraint::Simplex)
            .unwrap();
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(w.iter().all(|&x| x >= 0.0));
        assert!(w[0] > 0.9, "{:?}", w);
    }

    #[test]
    fn unconstrained_least_squares_recovers_scaling() {
        let mut problem = QraProblem::new(2);
        for y in [1.0, 2.0, 3.0, 5.0, 8.0] {
            problem
                .push(QraPoint {
                    level: 0.5,
                    predictions: vec![y / 2.0, 1.0 + y * y],
                    observation: y,
                })
                .unwrap();
        }
        let w = ProjectedGradientSolver::default()
            .solve(&problem, Objective::LeastSquares, Constraint::Unconstrained)
            .unwrap();
        assert_relative_eq!(w[0], 2.0, epsilon = 1e-5);
        assert_relative_eq!(w[1], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn projected_gradient_rejects_pinball() {
        let result =
            ProjectedGradientSolver::default().solve(&problem(), Objective::Pinball, Constraint::Simplex);
        assert!(matches!(result, Err(EnsembleError::InvalidParameter(_))));
    }

    #[test]
    fn empty_problem_is_rejected() {
        let result =
            NelderMeadSolver::default().solve(&QraProblem::new(2), Objective::Pinball, Constraint::Simplex);
        assert_eq!(result, Err(EnsembleError::EmptyData));
    }
}

//! Estimation of ensemble weights from past performance.
//!
//! Two strategies are available:
//! - [`InverseErrorWeighting`]: weights proportional to the inverse of
//!   each model's recent mean score.
//! - [`QuantileRegressionAveraging`]: coefficients fit by regressing
//!   observations on the member quantiles.
//!
//! Both only use information available on the origin day a weight set is
//! estimated for.

mod inverse_error;
mod qra;
mod solver;
mod weights;

pub use inverse_error::{Fallback, InverseErrorConfig, InverseErrorWeighting};
pub use qra::{QraConfig, QraResult, QraSolver, QuantileRegressionAveraging, QRA_ENSEMBLE_NAME};
pub use solver::{
    Constraint, NelderMeadSolver, Objective, ProjectedGradientSolver, QraPoint, QraProblem,
    WeightSolver,
};
pub use weights::{ModelWeight, ModelWeights, TrainingWindow, WeightGrouping};

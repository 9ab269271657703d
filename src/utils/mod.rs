//! Numerical helpers shared by the converter, combiner and weight estimators.

pub mod ols;
pub mod optimization;
pub mod stats;

pub use ols::ols_fit;
pub use optimization::{
    nelder_mead, project_to_simplex, softmax_weights, NelderMeadConfig, NelderMeadResult,
};
pub use stats::{empirical_quantile, mean, median, weighted_sum};

//! Ensemble forecasting methods.
//!
//! Combines quantile forecasts of several models into unweighted
//! (mean, median), filtered and weighted ensembles.

mod combine;

pub(crate) use combine::{combine_with_coefficients, group_by_target};
pub use combine::{
    filtered_combine, unweighted_combine, weighted_combine, EnsembleCombiner, Statistic,
    WEIGHTED_ENSEMBLE_NAME,
};

//! # quantile-ensembles
//!
//! Quantile-based ensembling, performance weighting and proper scoring of
//! probabilistic forecasts.
//!
//! Forecasts arrive either as samples (draws from a predictive
//! distribution) or as quantiles. Samples are converted to quantiles on a
//! fixed grid, quantiles of several models are combined level by level,
//! combination weights are estimated from past scores without using
//! information from after the origin day, and both inputs and ensembles
//! are scored with the CRPS, the weighted interval score and PIT
//! histograms.
//!
//! ```
//! use quantile_ensembles::prelude::*;
//!
//! let key = |model: &str| ForecastKey::new(model, 0, 7).unwrap();
//! let grid = QuantileGrid::new(vec![0.25, 0.5, 0.75]).unwrap();
//! let samples = vec![
//!     SampleForecast::from_values(key("a"), (0..100).map(|i| i as f64).collect()).unwrap(),
//!     SampleForecast::from_values(key("b"), (50..150).map(|i| i as f64).collect()).unwrap(),
//! ];
//!
//! let quantiles = samples_to_quantiles(&samples, &grid).unwrap();
//! let ensemble = unweighted_combine(&quantiles, Statistic::Mean).unwrap();
//! assert_eq!(ensemble[0].model(), "Mean ensemble");
//! assert!((ensemble[0].median().unwrap() - 74.5).abs() < 1e-9);
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod ensemble;
pub mod error;
pub mod quantile;
pub mod scoring;
pub mod utils;
pub mod weighting;

pub use error::{EnsembleError, Result};

pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::core::{
        ForecastKey, Observation, Observations, QuantileForecast, SampleForecast,
    };
    pub use crate::ensemble::{
        filtered_combine, unweighted_combine, weighted_combine, EnsembleCombiner, Statistic,
    };
    pub use crate::error::{EnsembleError, Result};
    pub use crate::quantile::{samples_to_quantiles, QuantileGrid};
    pub use crate::scoring::{
        crps, pit_histogram, score_quantiles, score_samples, summarise, weighted_interval_score,
        Metric, PitConfig, Scale, ScoreField,
    };
    pub use crate::weighting::{
        InverseErrorConfig, InverseErrorWeighting, ModelWeights, QraConfig,
        QuantileRegressionAveraging,
    };
}

//! Proper scoring rules and calibration diagnostics.
//!
//! Sample forecasts are scored with the CRPS, quantile forecasts with the
//! weighted interval score. Both can be evaluated on the natural or the
//! log scale, and score tables can be summarised by any subset of
//! identifying fields.

mod batch;
mod crps;
mod interval;
mod metrics;
mod pit;
mod summary;
mod transform;

pub use batch::{score_quantiles, score_samples};
pub use crps::crps;
pub use interval::{
    interval_coverage, mean_pinball_loss, pinball_loss, quantile_bias, weighted_interval_score,
    WisComponents,
};
pub use metrics::{GroupValue, Metric, Scale, Score, ScoreField};
pub use pit::{
    pit_histogram, pit_uniformity, pit_value, PitBin, PitConfig, PitHistogram, UniformityTest,
};
pub use summary::{summarise, summarise_with, ScoreSummary, SummaryStatistic};
pub use transform::{log_transform_observations, log_transform_quantiles, log_transform_samples};

//! Core data structures for probabilistic forecasts and observations.

mod forecast;
mod observation;

pub use forecast::{
    group_quantiles, group_samples, Draw, ForecastKey, QuantileForecast, QuantileRecord,
    SampleForecast, SampleRecord, LEVEL_TOLERANCE,
};
pub use observation::{Observation, Observations};

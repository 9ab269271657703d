//! Sample to quantile conversion.

mod convert;
mod grid;

pub use convert::{sample_to_quantile, samples_to_quantiles};
pub use grid::QuantileGrid;

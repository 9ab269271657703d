//! Quantile level grids.

use serde::{Deserialize, Serialize};

use crate::core::LEVEL_TOLERANCE;
use crate::error::{EnsembleError, Result};

/// A sorted set of distinct quantile levels in (0, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct QuantileGrid {
    levels: Vec<f64>,
}

impl QuantileGrid {
    /// Create a grid from arbitrary levels; they are sorted and validated.
    pub fn new(mut levels: Vec<f64>) -> Result<Self> {
        if levels.is_empty() {
            return Err(EnsembleError::EmptyData);
        }
        if let Some(bad) = levels.iter().find(|&&l| !(l > 0.0 && l < 1.0)) {
            return Err(EnsembleError::InvalidParameter(format!(
                "quantile level {} outside (0, 1)",
                bad
            )));
        }
        levels.sort_by(|a, b| a.total_cmp(b));
        if let Some(w) = levels.windows(2).find(|w| w[1] - w[0] < LEVEL_TOLERANCE) {
            return Err(EnsembleError::DuplicateEntry(format!(
                "quantile level {}",
                w[1]
            )));
        }
        Ok(Self { levels })
    }

    /// The 23 levels commonly requested by forecast hubs.
    pub fn hub() -> Self {
        let mut levels = vec![0.01, 0.025];
        levels.extend((1..=19).map(|i| i as f64 / 20.0));
        levels.extend([0.975, 0.99]);
        Self { levels }
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl Default for QuantileGrid {
    /// Percentiles 0.01, 0.02, ..., 0.99.
    fn default() -> Self {
        Self {
            levels: (1..=99).map(|i| i as f64 / 100.0).collect(),
        }
    }
}

impl TryFrom<Vec<f64>> for QuantileGrid {
    type Error = EnsembleError;

    fn try_from(levels: Vec<f64>) -> Result<Self> {
        Self::new(levels)
    }
}

impl From<QuantileGrid> for Vec<f64> {
    fn from(grid: QuantileGrid) -> Self {
        grid.levels
    }
}

//! Observed ground truth, one value per day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, Result};

/// One observed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub day: i64,
    pub value: f64,
}

/// Observed values indexed by day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observations {
    by_day: BTreeMap<i64, f64>,
}

impl Observations {
    /// Build from observations; each day may appear once and values must be finite.
    pub fn new<I>(observations: I) -> Result<Self>
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut by_day = BTreeMap::new();
        for obs in observations {
            if !obs.value.is_finite() {
                return Err(EnsembleError::MissingValues);
            }
            if by_day.insert(obs.day, obs.value).is_some() {
                return Err(EnsembleError::DuplicateEntry(format!(
                    "observation for day {}",
                    obs.day
                )));
            }
        }
        Ok(Self { by_day })
    }

    /// Build from a contiguous series starting at `first_day`.
    pub fn from_series(first_day: i64, values: &[f64]) -> Result<Self> {
        Self::new(values.iter().enumerate().map(|(i, &value)| Observation {
            day: first_day + i as i64,
            value,
        }))
    }

    pub fn get(&self, day: i64) -> Option<f64> {
        self.by_day.get(&day).copied()
    }

    pub fn len(&self) -> usize {
        self.by_day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }

    /// Observations in day order.
    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        self.by_day
            .iter()
            .map(|(&day, &value)| Observation { day, value })
    }

    /// Smallest observed value.
    pub fn min_value(&self) -> Option<f64> {
        self.by_day.values().copied().reduce(f64::min)
    }

    /// Apply `f` to every value.
    pub fn map_values<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(f64) -> f64,
    {
        Self::new(self.iter().map(|o| Observation {
            day: o.day,
            value: f(o.value),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observations_reject_duplicate_days() {
        let result = Observations::new(vec![
            Observation { day: 3, value: 1.0 },
            Observation { day: 3, value: 2.0 },
        ]);
        assert!(matches!(result, Err(EnsembleError::DuplicateEntry(_))));
    }

    #[test]
    fn observations_from_series() {
        let obs = Observations::from_series(80, &[5.0, 7.0, 2.0]).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs.get(81), Some(7.0));
        assert_eq!(obs.get(83), None);
        assert_eq!(obs.min_value(), Some(2.0));
    }
}

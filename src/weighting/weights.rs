//! Weight tables and the shared training-window vocabulary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, Result};

/// Weight of one model for one origin day, optionally for a single horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeight {
    pub model: String,
    pub origin_day: i64,
    /// `None` for weights pooled over all horizons.
    pub horizon: Option<i64>,
    pub weight: f64,
}

/// Whether weights are estimated across all horizons or per horizon.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightGrouping {
    /// One weight set per origin day.
    #[default]
    Pooled,
    /// One weight set per origin day and listed horizon.
    PerHorizon(Vec<i64>),
}

impl WeightGrouping {
    /// Horizon labels of the weight sets produced for one origin day.
    pub fn horizons(&self) -> Vec<Option<i64>> {
        match self {
            WeightGrouping::Pooled => vec![None],
            WeightGrouping::PerHorizon(hs) => hs.iter().map(|&h| Some(h)).collect(),
        }
    }
}

/// Extent of the training history behind a weight set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingWindow {
    /// All eligible history.
    Expanding,
    /// Only the trailing number of origin days.
    Rolling(i64),
}

impl TrainingWindow {
    /// Whether a past origin day falls inside the window ending at `latest_origin`.
    pub fn contains(&self, origin_day: i64, latest_origin: i64) -> bool {
        match *self {
            TrainingWindow::Expanding => origin_day <= latest_origin,
            TrainingWindow::Rolling(days) => {
                origin_day <= latest_origin && origin_day > latest_origin - days
            }
        }
    }
}

/// Table of model weights keyed by (origin day, horizon, model).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelWeights {
    by_key: BTreeMap<(i64, Option<i64>, String), f64>,
}

impl ModelWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows; each (model, origin day, horizon) may appear once.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = ModelWeight>,
    {
        let mut weights = Self::new();
        for entry in entries {
            weights.insert(entry)?;
        }
        Ok(weights)
    }

    /// Equal pooled weights for every model on every origin day.
    ///
    /// This is the explicit fallback policy callers apply before
    /// [`crate::ensemble::weighted_combine`] when no history exists.
    pub fn uniform<S: AsRef<str>>(models: &[S], origin_days: &[i64]) -> Self {
        let share = 1.0 / models.len().max(1) as f64;
        let by_key = origin_days
            .iter()
            .flat_map(|&day| {
                models
                    .iter()
                    .map(move |m| ((day, None, m.as_ref().to_string()), share))
            })
            .collect();
        Self { by_key }
    }

    /// Add one weight; weights must be finite.
    pub fn insert(&mut self, entry: ModelWeight) -> Result<()> {
        if !entry.weight.is_finite() {
            return Err(EnsembleError::MissingValues);
        }
        let key = (entry.origin_day, entry.horizon, entry.model);
        if self.by_key.contains_key(&key) {
            return Err(EnsembleError::DuplicateEntry(format!(
                "weight for model '{}' at origin day {} (horizon {:?})",
                key.2, key.0, key.1
            )));
        }
        self.by_key.insert(key, entry.weight);
        Ok(())
    }

    /// Merge another table into this one.
    pub fn extend(&mut self, other: ModelWeights) -> Result<()> {
        for entry in other.records() {
            self.insert(entry)?;
        }
        Ok(())
    }

    /// Weight for a model at an origin day and horizon.
    ///
    /// A per-horizon entry takes precedence over the pooled entry.
    pub fn lookup(&self, model: &str, origin_day: i64, horizon: i64) -> Option<f64> {
        self.by_key
            .get(&(origin_day, Some(horizon), model.to_string()))
            .or_else(|| self.by_key.get(&(origin_day, None, model.to_string())))
            .copied()
    }

    /// Weights of one (origin day, horizon) group, by model name.
    pub fn group(&self, origin_day: i64, horizon: Option<i64>) -> BTreeMap<&str, f64> {
        self.by_key
            .range((origin_day, horizon, String::new())..)
            .take_while(|((d, h, _), _)| *d == origin_day && *h == horizon)
            .map(|((_, _, m), &w)| (m.as_str(), w))
            .collect()
    }

    /// Rows in (origin day, horizon, model) order.
    pub fn records(&self) -> Vec<ModelWeight> {
        self.by_key
            .iter()
            .map(|((origin_day, horizon, model), &weight)| ModelWeight {
                model: model.clone(),
                origin_day: *origin_day,
                horizon: *horizon,
                weight,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

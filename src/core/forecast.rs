//! Sample-based and quantile-based probabilistic forecasts.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, Result};

/// Tolerance used when comparing quantile levels across forecasts.
pub const LEVEL_TOLERANCE: f64 = 1e-9;

/// Identity of a forecast: which model predicted which day, and when.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForecastKey {
    /// Producing model or ensemble.
    pub model: String,
    /// Day the forecast was made.
    pub origin_day: i64,
    /// Day being predicted.
    pub target_day: i64,
}

impl ForecastKey {
    /// Create a key, requiring `target_day > origin_day`.
    pub fn new(model: impl Into<String>, origin_day: i64, target_day: i64) -> Result<Self> {
        if target_day <= origin_day {
            return Err(EnsembleError::InvalidParameter(format!(
                "horizon must be at least 1 (origin day {}, target day {})",
                origin_day, target_day
            )));
        }
        Ok(Self {
            model: model.into(),
            origin_day,
            target_day,
        })
    }

    /// Days between the origin and the target.
    pub fn horizon(&self) -> i64 {
        self.target_day - self.origin_day
    }

    /// Same origin and target, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            origin_day: self.origin_day,
            target_day: self.target_day,
        }
    }
}

/// A single predictive draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    pub id: usize,
    pub value: f64,
}

/// Sample-based forecast: a set of draws for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleForecast {
    key: ForecastKey,
    draws: Vec<Draw>,
}

impl SampleForecast {
    /// Create a sample forecast. Draw ids must be unique and values finite.
    ///
    /// An empty draw set is accepted here; consumers that need draws
    /// report [`EnsembleError::InsufficientSamples`].
    pub fn new(key: ForecastKey, draws: Vec<Draw>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(draws.len());
        for draw in &draws {
            if !draw.value.is_finite() {
                return Err(EnsembleError::MissingValues);
            }
            if !seen.insert(draw.id) {
                return Err(EnsembleError::DuplicateEntry(format!(
                    "draw {} for model '{}' (origin day {}, target day {})",
                    draw.id, key.model, key.origin_day, key.target_day
                )));
            }
        }
        Ok(Self { key, draws })
    }

    /// Create a sample forecast from plain values, numbering draws from zero.
    pub fn from_values(key: ForecastKey, values: Vec<f64>) -> Result<Self> {
        let draws = values
            .into_iter()
            .enumerate()
            .map(|(id, value)| Draw { id, value })
            .collect();
        Self::new(key, draws)
    }

    pub fn key(&self) -> &ForecastKey {
        &self.key
    }

    pub fn model(&self) -> &str {
        &self.key.model
    }

    pub fn origin_day(&self) -> i64 {
        self.key.origin_day
    }

    pub fn target_day(&self) -> i64 {
        self.key.target_day
    }

    pub fn horizon(&self) -> i64 {
        self.key.horizon()
    }

    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    /// Draw values in storage order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.draws.iter().map(|d| d.value)
    }

    /// Draw values sorted ascending.
    pub fn sorted_values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.values().collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Apply `f` to every draw value, keeping ids and key.
    pub fn map_values<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(f64) -> f64,
    {
        let draws = self
            .draws
            .iter()
            .map(|d| Draw {
                id: d.id,
                value: f(d.value),
            })
            .collect();
        Self::new(self.key.clone(), draws)
    }
}

/// Quantile-based forecast: predicted values at increasing quantile levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileForecast {
    key: ForecastKey,
    levels: Vec<f64>,
    values: Vec<f64>,
}

impl QuantileForecast {
    /// Create a quantile forecast from parallel level/value vectors.
    ///
    /// Pairs are sorted by level. Levels must lie in (0, 1) and be distinct;
    /// values must be non-decreasing in level.
    pub fn new(key: ForecastKey, levels: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if levels.len() != values.len() {
            return Err(EnsembleError::DimensionMismatch {
                expected: levels.len(),
                got: values.len(),
            });
        }
        Self::from_pairs(key, levels.into_iter().zip(values))
    }

    /// Create a quantile forecast from `(level, value)` pairs.
    pub fn from_pairs<I>(key: ForecastKey, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut pairs: Vec<(f64, f64)> = pairs.into_iter().collect();
        if pairs.is_empty() {
            return Err(EnsembleError::EmptyData);
        }

        for &(level, value) in &pairs {
            if !(level > 0.0 && level < 1.0) {
                return Err(EnsembleError::InvalidParameter(format!(
                    "quantile level {} outside (0, 1)",
                    level
                )));
            }
            if !value.is_finite() {
                return Err(EnsembleError::MissingValues);
            }
        }

        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        for w in pairs.windows(2) {
            if (w[1].0 - w[0].0).abs() < LEVEL_TOLERANCE {
                return Err(EnsembleError::DuplicateEntry(format!(
                    "quantile level {} for model '{}'",
                    w[1].0, key.model
                )));
            }
            if w[1].1 < w[0].1 {
                return Err(EnsembleError::CrossingQuantiles {
                    model: key.model.clone(),
                    origin_day: key.origin_day,
                    target_day: key.target_day,
                    level: w[1].0,
                });
            }
        }

        let (levels, values) = pairs.into_iter().unzip();
        Ok(Self {
            key,
            levels,
            values,
        })
    }

    pub fn key(&self) -> &ForecastKey {
        &self.key
    }

    pub fn model(&self) -> &str {
        &self.key.model
    }

    pub fn origin_day(&self) -> i64 {
        self.key.origin_day
    }

    pub fn target_day(&self) -> i64 {
        self.key.target_day
    }

    pub fn horizon(&self) -> i64 {
        self.key.horizon()
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate `(level, value)` pairs in increasing level order.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.levels.iter().copied().zip(self.values.iter().copied())
    }

    /// Predicted value at a quantile level, if that level is on the grid.
    pub fn value_at(&self, level: f64) -> Option<f64> {
        self.levels
            .iter()
            .position(|&l| (l - level).abs() < LEVEL_TOLERANCE)
            .map(|i| self.values[i])
    }

    /// Predicted median, if level 0.5 is on the grid.
    pub fn median(&self) -> Option<f64> {
        self.value_at(0.5)
    }

    /// Whether both forecasts use the same quantile levels.
    pub fn same_grid(&self, other: &QuantileForecast) -> bool {
        self.levels.len() == other.levels.len()
            && self
                .levels
                .iter()
                .zip(other.levels.iter())
                .all(|(a, b)| (a - b).abs() < LEVEL_TOLERANCE)
    }

    /// Copy of this forecast under another model name.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            key: self.key.with_model(model),
            levels: self.levels.clone(),
            values: self.values.clone(),
        }
    }

    /// Apply a monotone transform `f` to every value.
    pub fn map_values<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(f64) -> f64,
    {
        let values = self.values.iter().map(|&v| f(v)).collect();
        Self::new(self.key.clone(), self.levels.clone(), values)
    }

    /// Flatten into one table row per quantile level.
    pub fn to_records(&self) -> Vec<QuantileRecord> {
        self.pairs()
            .map(|(quantile_level, predicted_value)| QuantileRecord {
                model: self.key.model.clone(),
                origin_day: self.key.origin_day,
                horizon: self.key.horizon(),
                target_day: self.key.target_day,
                quantile_level,
                predicted_value,
            })
            .collect()
    }
}

/// One row of a sample forecast table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub model: String,
    pub origin_day: i64,
    pub horizon: i64,
    pub target_day: i64,
    pub draw_id: usize,
    pub predicted_value: f64,
}

/// One row of a quantile forecast table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileRecord {
    pub model: String,
    pub origin_day: i64,
    pub horizon: i64,
    pub target_day: i64,
    pub quantile_level: f64,
    pub predicted_value: f64,
}

fn record_key(model: &str, origin_day: i64, horizon: i64, target_day: i64) -> Result<ForecastKey> {
    let key = ForecastKey::new(model, origin_day, target_day)?;
    if key.horizon() != horizon {
        return Err(EnsembleError::InvalidParameter(format!(
            "horizon {} does not match origin day {} and target day {}",
            horizon, origin_day, target_day
        )));
    }
    Ok(key)
}

/// Group sample rows into one forecast per (model, origin day, target day).
pub fn group_samples(records: &[SampleRecord]) -> Result<Vec<SampleForecast>> {
    let mut groups: BTreeMap<ForecastKey, Vec<Draw>> = BTreeMap::new();
    for r in records {
        let key = record_key(&r.model, r.origin_day, r.horizon, r.target_day)?;
        groups.entry(key).or_default().push(Draw {
            id: r.draw_id,
            value: r.predicted_value,
        });
    }

    groups
        .into_iter()
        .map(|(key, draws)| SampleForecast::new(key, draws))
        .collect()
}

/// Group quantile rows into one forecast per (model, origin day, target day).
pub fn group_quantiles(records: &[QuantileRecord]) -> Result<Vec<QuantileForecast>> {
    let mut groups: BTreeMap<ForecastKey, Vec<(f64, f64)>> = BTreeMap::new();
    for r in records {
        let key = record_key(&r.model, r.origin_day, r.horizon, r.target_day)?;
        groups
            .entry(key)
            .or_default()
            .push((r.quantile_level, r.predicted_value));
    }

    groups
        .into_iter()
        .map(|(key, pairs)| QuantileForecast::from_pairs(key, pairs))
        .collect()
}

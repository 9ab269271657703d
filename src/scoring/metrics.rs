//! Score records and the fields they can be grouped by.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ForecastKey;
use crate::error::{EnsembleError, Result};

/// Scale on which forecasts and observations were scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    #[default]
    Natural,
    Log,
}

/// Metric columns of a score table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Continuous ranked probability score (sample forecasts).
    Crps,
    /// Weighted interval score (quantile forecasts).
    Wis,
    /// Width component of the WIS.
    Dispersion,
    /// Penalty for observations above the predicted intervals.
    Underprediction,
    /// Penalty for observations below the predicted intervals.
    Overprediction,
    /// Absolute error of the predicted median.
    AbsErrorMedian,
    /// Directional bias in [-1, 1]; positive means over-prediction.
    Bias,
    /// 1 if the observation is inside the central 50% interval.
    Coverage50,
    /// 1 if the observation is inside the central 90% interval.
    Coverage90,
}

impl Metric {
    /// Whether the metric is a non-negative error, lower being better.
    pub fn is_error(self) -> bool {
        !matches!(self, Metric::Bias | Metric::Coverage50 | Metric::Coverage90)
    }
}

/// Result of scoring one forecast against its observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub key: ForecastKey,
    pub scale: Scale,
    pub metrics: BTreeMap<Metric, f64>,
}

impl Score {
    pub fn new(key: ForecastKey, scale: Scale) -> Self {
        Self {
            key,
            scale,
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style metric insertion.
    pub fn with_metric(mut self, metric: Metric, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
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
}

/// Identifying fields that scores and forecasts can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    Model,
    OriginDay,
    Horizon,
    TargetDay,
    Scale,
}

/// Value of one grouping field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupValue {
    Model(String),
    OriginDay(i64),
    Horizon(i64),
    TargetDay(i64),
    Scale(Scale),
}

impl ScoreField {
    /// Value of this field for a forecast key; `scale` is required only for [`ScoreField::Scale`].
    pub(crate) fn value(self, key: &ForecastKey, scale: Option<Scale>) -> Result<GroupValue> {
        Ok(match self {
            ScoreField::Model => GroupValue::Model(key.model.clone()),
            ScoreField::OriginDay => GroupValue::OriginDay(key.origin_day),
            ScoreField::Horizon => GroupValue::Horizon(key.horizon()),
            ScoreField::TargetDay => GroupValue::TargetDay(key.target_day),
            ScoreField::Scale => GroupValue::Scale(scale.ok_or_else(|| {
                EnsembleError::InvalidParameter("forecasts carry no scale to group by".into())
            })?),
        })
    }
}

/// Group key of a forecast for a list of fields.
pub(crate) fn group_key(
    fields: &[ScoreField],
    key: &ForecastKey,
    scale: Option<Scale>,
) -> Result<Vec<GroupValue>> {
    fields.iter().map(|f| f.value(key, scale)).collect()
}

//! Aggregation of score tables by arbitrary identifying fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scoring::metrics::group_key;
use crate::scoring::{GroupValue, Metric, Score, ScoreField};
use crate::utils::stats::{mean, median};

/// Reduction applied to each metric within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatistic {
    #[default]
    Mean,
    Median,
}

/// Summary of one group of scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// Values of the grouping fields, in the order requested.
    pub group: Vec<GroupValue>,
    /// Number of scores in the group.
    pub n: usize,
    pub metrics: BTreeMap<Metric, f64>,
}

impl ScoreSummary {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}

/// Mean of every metric per group of `by` fields.
pub fn summarise(scores: &[Score], by: &[ScoreField]) -> Result<Vec<ScoreSummary>> {
    summarise_with(scores, by, SummaryStatistic::Mean)
}

/// Reduce every metric per group of `by` fields with `statistic`.
///
/// An empty `by` yields one overall group. A metric missing from some
/// scores is reduced over the scores that have it.
pub fn summarise_with(
    scores: &[Score],
    by: &[ScoreField],
    statistic: SummaryStatistic,
) -> Result<Vec<ScoreSummary>> {
    let mut groups: BTreeMap<Vec<GroupValue>, (usize, BTreeMap<Metric, Vec<f64>>)> =
        BTreeMap::new();

    for score in scores {
        let key = group_key(by, &score.key, Some(score.scale))?;
        let (n, columns) = groups.entry(key).or_default();
        *n += 1;
        for (&metric, &value) in &score.metrics {
            columns.entry(metric).or_default().push(value);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(group, (n, columns))| ScoreSummary {
            group,
            n,
            metrics: columns
                .into_iter()
                .map(|(metric, values)| {
                    let reduced = match statistic {
                        SummaryStatistic::Mean => mean(&values),
                        SummaryStatistic::Median => median(&values),
                    };
                    (metric, reduced)
                })
                .collect(),
        })
        .collect())
}

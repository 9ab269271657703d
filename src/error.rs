//! Error types for the quantile-ensembles library.

use thiserror::Error;

/// Result type alias for ensembling and scoring operations.
pub type Result<T> = std::result::Result<T, EnsembleError>;

/// Errors that can occur while converting, combining, weighting or scoring forecasts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnsembleError {
    /// A sample forecast group has no draws.
    #[error("no samples for model '{model}' (origin day {origin_day}, target day {target_day})")]
    InsufficientSamples {
        model: String,
        origin_day: i64,
        target_day: i64,
    },

    /// Contributing models do not share the same quantile levels.
    #[error("model '{model}' uses quantile levels {got:?}, expected {expected:?}")]
    IncompatibleQuantileGrid {
        model: String,
        expected: Vec<f64>,
        got: Vec<f64>,
    },

    /// A model in the forecast set has no weight for its group.
    #[error("no weight for model '{model}' at origin day {origin_day} (horizon {horizon})")]
    MissingWeight {
        model: String,
        origin_day: i64,
        horizon: i64,
    },

    /// The training window is too small to fit weights.
    #[error("insufficient training data for origin day {origin_day}: need at least {needed}, got {got}")]
    InsufficientTrainingData {
        origin_day: i64,
        needed: usize,
        got: usize,
    },

    /// Log transform offset would produce a non-finite value.
    #[error("invalid log offset {offset}: smallest value is {min_value}, offset must exceed its negation")]
    InvalidOffset { offset: f64, min_value: f64 },

    /// A quantile forecast decreases as the quantile level increases.
    #[error("crossing quantiles for model '{model}' (origin day {origin_day}, target day {target_day}) at level {level}")]
    CrossingQuantiles {
        model: String,
        origin_day: i64,
        target_day: i64,
        level: f64,
    },

    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Non-finite values detected when not allowed.
    #[error("missing or non-finite values detected in data")]
    MissingValues,

    /// The same identity appears twice where it must be unique.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Settings could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = EnsembleError::InsufficientSamples {
            model: "rw".to_string(),
            origin_day: 71,
            target_day: 85,
        };
        assert_eq!(
            err.to_string(),
            "no samples for model 'rw' (origin day 71, target day 85)"
        );

        let err = EnsembleError::MissingWeight {
            model: "stat".to_string(),
            origin_day: 50,
            horizon: 3,
        };
        assert_eq!(
            err.to_string(),
            "no weight for model 'stat' at origin day 50 (horizon 3)"
        );

        let err = EnsembleError::InsufficientTrainingData {
            origin_day: 30,
            needed: 3,
            got: 1,
        };
        assert_eq!(
            err.to_string(),
            "insufficient training data for origin day 30: need at least 3, got 1"
        );

        let err = EnsembleError::InvalidOffset {
            offset: 0.0,
            min_value: 0.0,
        };
        assert!(err.to_string().starts_with("invalid log offset 0"));

        let err = EnsembleError::InvalidParameter("bins must be positive".to_string());
        assert_eq!(err.to_string(), "invalid parameter: bins must be positive");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = EnsembleError::EmptyData;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}

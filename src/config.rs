//! Settings for the ensembling pipeline, loadable from TOML.
//!
//! Every section is optional; missing sections and keys take their
//! defaults.
//!
//! ```
//! use quantile_ensembles::config::Settings;
//!
//! let settings = Settings::from_toml_str(
//!     r#"
//!     grid = [0.05, 0.25, 0.5, 0.75, 0.95]
//!
//!     [inverse_error]
//!     lag = 7
//!     window = { rolling = 28 }
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(settings.grid.len(), 5);
//! assert_eq!(settings.inverse_error.lag, 7);
//! assert_eq!(settings.qra.min_pairs, 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, Result};
use crate::quantile::QuantileGrid;
use crate::scoring::PitConfig;
use crate::weighting::{InverseErrorConfig, QraConfig};

/// Grouped configuration of all components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Quantile levels used when converting samples.
    pub grid: QuantileGrid,
    pub inverse_error: InverseErrorConfig,
    pub qra: QraConfig,
    pub pit: PitConfig,
}

impl Settings {
    /// Parse settings from a TOML document.
    ///
    /// The PIT section is validated on load; the weighting sections are
    /// checked when their estimators run.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| EnsembleError::Config(e.to_string()))?;
        settings
            .pit
            .validate()
            .map_err(|e| EnsembleError::Config(format!("[pit] {}", e)))?;
        Ok(settings)
    }

    /// Render settings as a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EnsembleError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Metric, ScoreField};
    use crate::weighting::{Constraint, Fallback, Objective, TrainingWindow, WeightGrouping};

    #[test]
    fn empty_document_gives_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.grid.len(), 99);
        assert_eq!(settings.inverse_error.lag, 14);
        assert_eq!(settings.qra.window, TrainingWindow::Rolling(21));
        assert_eq!(settings.pit.bins, 10);
    }

    #[test]
    fn sections_override_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [inverse_error]
            metric = "crps"
            window = "expanding"
            fallback = { fixed = 0.05 }

            [qra]
            constraint = "unconstrained"
            objective = "least_squares"
            grouping = { per_horizon = [7, 14] }

            [pit]
            bins = 20
            group_by = ["model", "horizon"]
            seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(settings.inverse_error.metric, Metric::Crps);
        assert_eq!(settings.inverse_error.fallback, Fallback::Fixed(0.05));
        assert_eq!(settings.inverse_error.lag, 14);
        assert_eq!(settings.qra.constraint, Constraint::Unconstrained);
        assert_eq!(settings.qra.objective, Objective::LeastSquares);
        assert_eq!(settings.qra.grouping, WeightGrouping::PerHorizon(vec![7, 14]));
        assert_eq!(settings.pit.group_by, vec![ScoreField::Model, ScoreField::Horizon]);
        assert_eq!(settings.pit.seed, Some(42));
    }

    #[test]
    fn round_trip_through_toml() {
        let settings = Settings::default();
        let text = settings.to_toml_string().unwrap();
        assert_eq!(Settings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn invalid_documents_are_config_errors() {
        assert!(matches!(
            Settings::from_toml_str("grid = [0.5, 1.5]"),
            Err(EnsembleError::Config(_))
        ));
        assert!(matches!(
            Settings::from_toml_str("[inverse_error]\nlag = \"two weeks\""),
            Err(EnsembleError::Config(_))
        ));
        assert!(matches!(
            Settings::from_toml_str("[pit]\ngroup_by = [\"model\", \"scale\"]"),
            Err(EnsembleError::Config(_))
        ));
    }
}

//! Analytics configuration
//!
//! Every threshold, forecast assumption and placeholder constant the engine
//! uses lives here. Loaded from TOML; any missing key falls back to its
//! default, so an empty file is a valid configuration.
//!
//! ```toml
//! [thresholds]
//! max_termination_rate = 0.10
//!
//! [forecast]
//! horizon_months = 12
//!
//! [estimates]
//! mode = "fixed"
//! ```

use crate::error::CoreError;
use crate::estimates::EstimateMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub thresholds: InsightThresholds,
    pub forecast: ForecastConfig,
    pub trends: TrendConfig,
    pub placeholders: PlaceholderMetrics,
    pub estimates: EstimatesConfig,
}

/// Insight rule thresholds (rates are fractions, 0.15 = 15%)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    pub max_termination_rate: f64,
    pub min_renewal_rate: f64,
    pub min_compliance_rate: f64,
    pub min_vehicle_utilization: f64,
    /// Cap on contract IDs attached to a single insight
    pub max_related_contracts: usize,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            max_termination_rate: 0.15,
            min_renewal_rate: 0.7,
            min_compliance_rate: 0.9,
            min_vehicle_utilization: 0.7,
            max_related_contracts: 10,
        }
    }
}

/// Naive seasonal revenue forecast parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon_months: u32,
    /// Flat monthly growth assumption (0.02 = 2%)
    pub monthly_growth: f64,
    /// Half-width of the confidence interval relative to the prediction
    pub variance: f64,
    /// January..December multipliers
    pub seasonal_factors: [f64; 12],
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_months: 6,
            monthly_growth: 0.02,
            variance: 0.10,
            seasonal_factors: [0.8, 0.7, 0.9, 1.1, 1.2, 1.3, 1.4, 1.3, 1.1, 1.0, 1.1, 1.2],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub max_points: usize,
    /// Changes within +/- this percentage are reported as stable
    pub stable_band_pct: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            max_points: 12,
            stable_band_pct: 5.0,
        }
    }
}

/// Values the engine cannot derive from contract rows
///
/// They are reported as-is and listed in `ContractAnalytics::estimated_fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderMetrics {
    pub compliance_rate: f64,
    /// Out of 5
    pub customer_satisfaction: f64,
    pub vehicle_utilization: f64,
    /// Share of revenue assumed to be cost in performance reports
    pub cost_ratio: f64,
}

impl Default for PlaceholderMetrics {
    fn default() -> Self {
        Self {
            compliance_rate: 0.95,
            customer_satisfaction: 4.2,
            vehicle_utilization: 0.78,
            cost_ratio: 0.30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EstimatesConfig {
    pub mode: EstimateMode,
    /// Seed for `mode = "random"`; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl AnalyticsConfig {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(CoreError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| CoreError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })?;

        config.validate()?;
        debug!(path = %path.display(), "Loaded analytics configuration");
        Ok(config)
    }

    /// Resolve configuration: explicit path, then the user config dir, then defaults
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, CoreError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `<config_dir>/fleetboard/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fleetboard").join("config.toml"))
    }

    /// Reject values that would make the computations meaningless
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: &str| {
            Err(CoreError::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.forecast.horizon_months == 0 {
            return invalid("forecast.horizon_months must be at least 1");
        }
        if self.forecast.variance < 0.0 {
            return invalid("forecast.variance must not be negative");
        }
        if self.forecast.seasonal_factors.iter().any(|f| *f < 0.0) {
            return invalid("forecast.seasonal_factors must not be negative");
        }
        if self.trends.max_points == 0 {
            return invalid("trends.max_points must be at least 1");
        }
        if self.trends.stable_band_pct < 0.0 {
            return invalid("trends.stable_band_pct must not be negative");
        }
        if !(0.0..=1.0).contains(&self.placeholders.cost_ratio) {
            return invalid("placeholders.cost_ratio must be between 0 and 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalyticsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.forecast.horizon_months, 6);
        assert_eq!(config.forecast.seasonal_factors[6], 1.4);
        assert_eq!(config.estimates.mode, EstimateMode::Random);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[thresholds]\nmax_termination_rate = 0.1\n\n[estimates]\nmode = \"fixed\"\nseed = 7"
        )
        .unwrap();

        let config = AnalyticsConfig::load(file.path()).unwrap();

        assert_eq!(config.thresholds.max_termination_rate, 0.1);
        assert_eq!(config.thresholds.min_renewal_rate, 0.7);
        assert_eq!(config.estimates.mode, EstimateMode::Fixed);
        assert_eq!(config.estimates.seed, Some(7));
        assert_eq!(config.forecast, ForecastConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[forecast]\nhorizon_months = 0").unwrap();

        let err = AnalyticsConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_malformed_toml_is_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[thresholds\nmax_termination_rate = ").unwrap();

        let err = AnalyticsConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let err = AnalyticsConfig::discover(Some(Path::new("/nonexistent/fleetboard.toml")))
            .unwrap_err();
        assert!(matches!(err, CoreError::FileNotFound { .. }));
    }
}

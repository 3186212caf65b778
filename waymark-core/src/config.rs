//! Configuration types

use crate::{ConfigError, WaymarkError, WaymarkResult};
use serde::{Deserialize, Serialize};

/// Tuning knobs for progress projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaymarkConfig {
    /// A milestone is flagged at risk when its schedule variance is more
    /// than this many days behind
    pub at_risk_threshold_days: i64,
    /// Ascending completion percentages that trigger a progress alert the
    /// first time each is crossed
    pub progress_thresholds: Vec<f64>,
}

impl Default for WaymarkConfig {
    fn default() -> Self {
        Self {
            at_risk_threshold_days: 3,
            progress_thresholds: vec![25.0, 50.0, 75.0, 100.0],
        }
    }
}

impl WaymarkConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `WAYMARK_AT_RISK_THRESHOLD_DAYS`: days behind before the at-risk
    ///   flag is set (default: 3)
    /// - `WAYMARK_PROGRESS_THRESHOLDS`: comma-separated ascending
    ///   percentages (default: 25,50,75,100)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            at_risk_threshold_days: std::env::var("WAYMARK_AT_RISK_THRESHOLD_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.at_risk_threshold_days),
            progress_thresholds: std::env::var("WAYMARK_PROGRESS_THRESHOLDS")
                .ok()
                .and_then(|s| {
                    s.split(',')
                        .map(|part| part.trim().parse::<f64>())
                        .collect::<Result<Vec<_>, _>>()
                        .ok()
                })
                .unwrap_or(defaults.progress_thresholds),
        }
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(WaymarkError::Config) if invalid.
    ///
    /// Validates:
    /// - at_risk_threshold_days >= 0
    /// - every progress threshold in (0, 100]
    /// - progress thresholds strictly ascending
    pub fn validate(&self) -> WaymarkResult<()> {
        if self.at_risk_threshold_days < 0 {
            return Err(WaymarkError::Config(ConfigError::InvalidValue {
                field: "at_risk_threshold_days".to_string(),
                value: self.at_risk_threshold_days.to_string(),
                reason: "at_risk_threshold_days must be non-negative".to_string(),
            }));
        }

        for threshold in &self.progress_thresholds {
            if *threshold <= 0.0 || *threshold > 100.0 {
                return Err(WaymarkError::Config(ConfigError::InvalidValue {
                    field: "progress_thresholds".to_string(),
                    value: threshold.to_string(),
                    reason: "each threshold must be in (0, 100]".to_string(),
                }));
            }
        }

        for pair in self.progress_thresholds.windows(2) {
            if pair[1] <= pair[0] {
                return Err(WaymarkError::Config(ConfigError::NotAscending {
                    field: "progress_thresholds".to_string(),
                }));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(WaymarkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_at_risk_threshold_rejected() {
        let config = WaymarkConfig {
            at_risk_threshold_days: -1,
            ..WaymarkConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(WaymarkError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let config = WaymarkConfig {
            progress_thresholds: vec![25.0, 150.0],
            ..WaymarkConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(WaymarkError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_non_ascending_thresholds_rejected() {
        let config = WaymarkConfig {
            progress_thresholds: vec![50.0, 50.0],
            ..WaymarkConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(WaymarkError::Config(ConfigError::NotAscending { .. }))
        ));
    }

    #[test]
    fn test_empty_threshold_list_is_valid() {
        let config = WaymarkConfig {
            progress_thresholds: vec![],
            ..WaymarkConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}

//! Tunable thresholds for the coherence analyzer.

use serde::{Deserialize, Serialize};

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A threshold is out of range or inconsistent with another
    #[error("Invalid coherence config: {0}")]
    Invalid(String),

    /// YAML could not be parsed or produced
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Thresholds and weights used by [`crate::CoherenceAnalyzer`].
///
/// Curl and positive divergence are flagged when they *exceed* a bound;
/// negative divergence is flagged when it falls *below* one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoherenceConfig {
    /// Phrase length used for repetition detection
    pub ngram_size: usize,
    /// Curl above this flags a `high_curl` warning
    pub curl_warning: f64,
    /// Curl above this makes the `high_curl` region critical
    pub curl_critical: f64,
    /// Divergence above this flags `positive_divergence`
    pub positive_divergence_warning: f64,
    /// Divergence above this makes `positive_divergence` critical
    pub positive_divergence_critical: f64,
    /// Divergence below this flags `negative_divergence`
    pub negative_divergence_warning: f64,
    /// Divergence below this makes `negative_divergence` critical
    pub negative_divergence_critical: f64,
    /// Multiplier applied to conclusion-marker density
    pub closure_weight: f64,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            ngram_size: 3,
            curl_warning: 0.3,
            curl_critical: 0.6,
            positive_divergence_warning: 0.3,
            positive_divergence_critical: 0.6,
            negative_divergence_warning: -0.2,
            negative_divergence_critical: -0.4,
            closure_weight: 3.0,
        }
    }
}

impl CoherenceConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check that every band is ordered and in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ngram_size == 0 {
            return Err(ConfigError::Invalid("ngram_size must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.curl_warning) || !(0.0..=1.0).contains(&self.curl_critical) {
            return Err(ConfigError::Invalid(format!(
                "curl thresholds must be in [0, 1], got warning={} critical={}",
                self.curl_warning, self.curl_critical
            )));
        }
        if self.curl_warning > self.curl_critical {
            return Err(ConfigError::Invalid(
                "curl_warning must not exceed curl_critical".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.positive_divergence_warning)
            || self.positive_divergence_warning > self.positive_divergence_critical
            || self.positive_divergence_critical > 1.0
        {
            return Err(ConfigError::Invalid(format!(
                "positive divergence band must satisfy 0 <= warning <= critical <= 1, got {} / {}",
                self.positive_divergence_warning, self.positive_divergence_critical
            )));
        }
        if !(-1.0..=0.0).contains(&self.negative_divergence_warning)
            || self.negative_divergence_critical > self.negative_divergence_warning
            || self.negative_divergence_critical < -1.0
        {
            return Err(ConfigError::Invalid(format!(
                "negative divergence band must satisfy -1 <= critical <= warning <= 0, got {} / {}",
                self.negative_divergence_critical, self.negative_divergence_warning
            )));
        }
        if self.closure_weight <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "closure_weight must be > 0, got {}",
                self.closure_weight
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoherenceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = CoherenceConfig {
            curl_warning: 0.25,
            ..Default::default()
        };
        let yaml = config.to_yaml().unwrap();
        let parsed = CoherenceConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed = CoherenceConfig::from_yaml("closure_weight: 2.0\n").unwrap();
        assert_eq!(parsed.closure_weight, 2.0);
        assert_eq!(parsed.ngram_size, 3);
    }

    #[test]
    fn test_inverted_curl_band_rejected() {
        let config = CoherenceConfig {
            curl_warning: 0.7,
            curl_critical: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_negative_band_rejected() {
        let config = CoherenceConfig {
            negative_divergence_warning: -0.5,
            negative_divergence_critical: -0.3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

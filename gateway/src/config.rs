//! Gateway configuration.

use coherence::CoherenceConfig;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Configuration for a [`crate::Gateway`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Execution environment used when a validation context names none
    pub environment: String,
    /// Coherence threshold used when options set none
    pub default_coherence_threshold: f64,
    /// Ledger actor prefix; gate entries are logged as `{prefix}:{gate}`
    pub actor_prefix: String,
    /// Coherence analyzer thresholds
    pub coherence: CoherenceConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            default_coherence_threshold: 0.5,
            actor_prefix: "gate".to_string(),
            coherence: CoherenceConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if !(0.0..=1.0).contains(&self.default_coherence_threshold) {
            return Err(GatewayError::Config(format!(
                "default_coherence_threshold must be in [0, 1], got {}",
                self.default_coherence_threshold
            )));
        }
        if self.environment.trim().is_empty() {
            return Err(GatewayError::Config("environment must not be empty".to_string()));
        }
        if self.actor_prefix.trim().is_empty() {
            return Err(GatewayError::Config("actor_prefix must not be empty".to_string()));
        }
        self.coherence
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))
    }
}

//! Ledger configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Configuration for a [`crate::Ledger`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on any single storage call (ms)
    pub storage_timeout_ms: u64,
    /// Limit applied to queries that do not set one
    pub default_query_limit: Option<usize>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            storage_timeout_ms: 5_000,
            default_query_limit: None,
        }
    }
}

impl LedgerConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.storage_timeout_ms == 0 {
            return Err(LedgerError::Config(
                "storage_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.default_query_limit == Some(0) {
            return Err(LedgerError::Config(
                "default_query_limit must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.storage_timeout_ms, 5_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = LedgerConfig {
            storage_timeout_ms: 250,
            default_query_limit: Some(100),
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(LedgerConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = LedgerConfig {
            storage_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));
    }
}

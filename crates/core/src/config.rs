//! Session configuration

use crate::error::{AutosaveError, Result};
use crate::tracker::CompletionOrder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default debounce interval in milliseconds
pub const DEFAULT_FREQUENCY_MS: u64 = 1000;

/// Upper bound accepted for the debounce interval (1 hour)
pub const MAX_FREQUENCY_MS: u64 = 60 * 60 * 1000;

/// Autosave session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Quiet period after the last change before a save (default: 1000ms)
    #[serde(default = "default_frequency_ms")]
    pub frequency_ms: u64,

    /// Folding policy for out-of-order save completions
    #[serde(default)]
    pub completion_order: CompletionOrder,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            frequency_ms: DEFAULT_FREQUENCY_MS,
            completion_order: CompletionOrder::default(),
        }
    }
}

impl AutosaveConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.frequency_ms == 0 {
            return Err(AutosaveError::InvalidFrequency);
        }
        if self.frequency_ms > MAX_FREQUENCY_MS {
            return Err(AutosaveError::Config(format!(
                "frequency_ms must be at most {} (got {})",
                MAX_FREQUENCY_MS, self.frequency_ms
            )));
        }
        Ok(())
    }

    /// Debounce interval as a `Duration`
    pub fn frequency(&self) -> Duration {
        Duration::from_millis(self.frequency_ms)
    }
}

fn default_frequency_ms() -> u64 {
    DEFAULT_FREQUENCY_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AutosaveConfig::default();
        assert_eq!(config.frequency(), Duration::from_secs(1));
        assert_eq!(config.completion_order, CompletionOrder::HighestWins);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = AutosaveConfig::from_toml_str(
            "frequency_ms = 250\ncompletion_order = \"last-arrived\"\n",
        )
        .unwrap();
        assert_eq!(config.frequency_ms, 250);
        assert_eq!(config.completion_order, CompletionOrder::LastArrived);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = AutosaveConfig::from_toml_str("").unwrap();
        assert_eq!(config, AutosaveConfig::default());
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let err = AutosaveConfig::from_toml_str("frequency_ms = 0").unwrap_err();
        assert!(matches!(err, AutosaveError::InvalidFrequency));
    }

    #[test]
    fn test_out_of_range_frequency_rejected() {
        let config = AutosaveConfig {
            frequency_ms: MAX_FREQUENCY_MS + 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AutosaveError::Config(_))));
    }

    #[test]
    fn test_unknown_order_rejected() {
        let err = AutosaveConfig::from_toml_str("completion_order = \"random\"").unwrap_err();
        assert!(matches!(err, AutosaveError::ConfigParse(_)));
    }
}

//! Harness configuration.
//!
//! Every section has defaults matching the stock failpoint catalog, so an
//! empty TOML document is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FailpointError, Result};

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// How long a stopped member gets to exit, in milliseconds.
    pub trigger_timeout_ms: u64,

    /// How long a leader-targeted failpoint waits for an election, in
    /// milliseconds.
    pub leader_timeout_ms: u64,

    /// Seed for failpoint and member selection. Drawn from entropy if unset.
    pub seed: Option<u64>,

    /// Network failpoint settings.
    pub network: NetworkConfig,

    /// Random failpoint settings.
    pub random: RandomConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            trigger_timeout_ms: 1000,
            leader_timeout_ms: 5000,
            seed: None,
            network: NetworkConfig::default(),
            random: RandomConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Settings shared by the blackhole and delay failpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// How long the peer link stays degraded, in milliseconds.
    pub duration_ms: u64,

    /// Fixed latency added by the delay failpoint, in milliseconds.
    pub base_latency_ms: u64,

    /// Randomized latency on top of the base, in milliseconds.
    pub randomized_latency_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            duration_ms: 1000,
            base_latency_ms: 75,
            randomized_latency_ms: 50,
        }
    }
}

impl NetworkConfig {
    /// Returns the disruption length as a Duration.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Returns the base latency as a Duration.
    pub fn base_latency(&self) -> Duration {
        Duration::from_millis(self.base_latency_ms)
    }

    /// Returns the randomized latency as a Duration.
    pub fn randomized_latency(&self) -> Duration {
        Duration::from_millis(self.randomized_latency_ms)
    }
}

/// Settings for the random failpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Failpoints the random failpoint may choose from. Empty means every
    /// stable failpoint.
    pub include: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (pretty, json, compact).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Returns the trigger timeout as a Duration.
    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_millis(self.trigger_timeout_ms)
    }

    /// Returns the leader timeout as a Duration.
    pub fn leader_timeout(&self) -> Duration {
        Duration::from_millis(self.leader_timeout_ms)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.trigger_timeout_ms == 0 {
            return Err(FailpointError::InvalidConfiguration(
                "trigger_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.leader_timeout_ms == 0 {
            return Err(FailpointError::InvalidConfiguration(
                "leader_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.network.duration_ms == 0 {
            return Err(FailpointError::InvalidConfiguration(
                "network.duration_ms must be greater than zero".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(FailpointError::InvalidConfiguration(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(FailpointError::InvalidConfiguration(format!(
                "Invalid log format: {}",
                self.logging.format
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();

        assert_eq!(config.trigger_timeout(), Duration::from_secs(1));
        assert_eq!(config.leader_timeout(), Duration::from_secs(5));
        assert!(config.seed.is_none());
        assert!(config.random.include.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_network_durations() {
        let network = NetworkConfig::default();

        assert_eq!(network.duration(), Duration::from_secs(1));
        assert_eq!(network.base_latency(), Duration::from_millis(75));
        assert_eq!(network.randomized_latency(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = HarnessConfig::from_toml_str(
            r#"
            seed = 42

            [network]
            base_latency_ms = 200

            [random]
            include = ["Kill", "blackhole"]
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.trigger_timeout_ms, 1000);
        assert_eq!(config.network.base_latency_ms, 200);
        assert_eq!(config.network.randomized_latency_ms, 50);
        assert_eq!(config.random.include, vec!["Kill", "blackhole"]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = HarnessConfig::default();

        config.trigger_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(FailpointError::InvalidConfiguration(_))
        ));
        config.trigger_timeout_ms = 1000;

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "INFO".to_string();
        assert!(config.validate().is_ok());

        config.logging.format = "invalid".to_string();
        assert!(config.validate().is_err());

        // A jitter larger than the base latency is allowed.
        let mut config = HarnessConfig::default();
        config.network.randomized_latency_ms = 500;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_document() {
        let err = HarnessConfig::from_toml_str("trigger_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, FailpointError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = HarnessConfig::from_file("/nonexistent/failpoints.toml").unwrap_err();
        assert!(matches!(err, FailpointError::Io(_)));
    }

    #[test]
    fn test_config_serialization() {
        let mut config = HarnessConfig::default();
        config.seed = Some(7);
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: HarnessConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}

//! Configuration Types
//!
//! All configuration structures with sensible defaults. Supports global
//! (~/.config/patrol/) and project (.patrol/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::trends::DEFAULT_WINDOW;
use crate::llm::ProviderConfig;
use crate::orchestrator::AlertConfig;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    /// Configuration version
    pub version: String,

    /// LLM provider settings for the AI-quality agent
    pub llm: ProviderConfig,

    /// Alerting thresholds
    pub alerts: AlertConfig,

    /// Suite execution settings
    pub run: RunConfig,

    /// Trend analytics settings
    pub trends: TrendConfig,

    /// Report archive settings
    pub archive: ArchiveConfig,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: ProviderConfig::default(),
            alerts: AlertConfig::default(),
            run: RunConfig::default(),
            trends: TrendConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}

impl PatrolConfig {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `PatrolError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::types::PatrolError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(crate::types::PatrolError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.run.agent_timeout_secs == 0 {
            return Err(crate::types::PatrolError::Config(
                "Run agent_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.trends.window == 0 {
            return Err(crate::types::PatrolError::Config(
                "Trend window must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.alerts.min_success_rate) {
            return Err(crate::types::PatrolError::Config(format!(
                "Alert min_success_rate must be between 0 and 100, got {}",
                self.alerts.min_success_rate
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Run Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Per-agent execution budget in seconds
    pub agent_timeout_secs: u64,

    /// Trigger name used when none is given on the command line
    pub default_trigger: String,

    /// Seed for the simulated probe
    pub probe_seed: u64,

    /// Pass rate for the simulated probe, in [0, 1]
    pub probe_pass_rate: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            agent_timeout_secs: 120,
            default_trigger: "manual".to_string(),
            probe_seed: 42,
            probe_pass_rate: 0.92,
        }
    }
}

// =============================================================================
// Trend Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Rolling window of reports covered by trend queries
    pub window: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

// =============================================================================
// Archive Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Persist reports to SQLite
    pub enabled: bool,

    /// Archive database path (relative to .patrol/)
    pub path: PathBuf,

    /// Reports kept before pruning
    pub retention: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("reports.db"),
            retention: 500,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PatrolConfig::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "scripted");
        assert_eq!(config.trends.window, DEFAULT_WINDOW);
        config.validate().unwrap();
    }

    #[test]
    fn temperature_out_of_range_rejected() {
        let mut config = PatrolConfig::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_trend_window_rejected() {
        let mut config = PatrolConfig::default();
        config.trends.window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn success_rate_threshold_bounded() {
        let mut config = PatrolConfig::default();
        config.alerts.min_success_rate = 140.0;
        assert!(config.validate().is_err());
    }
}

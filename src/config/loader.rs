//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/patrol/config.toml)
//! 3. Project config (.patrol/config.toml)
//! 4. Environment variables (PATROL_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::PatrolConfig;
use crate::types::{PatrolError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<PatrolConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(PatrolConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                debug!("Loading global config from: {}", global_path.display());
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // Environment variables (e.g., PATROL_LLM_MODEL -> llm.model)
        figment = figment.merge(Env::prefixed("PATROL_").split('_').lowercase(true));

        let config: PatrolConfig = figment
            .extract()
            .map_err(|e| PatrolError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<PatrolConfig> {
        let config: PatrolConfig = Figment::new()
            .merge(Serialized::defaults(PatrolConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| PatrolError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/patrol/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("patrol"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".patrol/config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".patrol")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file path
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| PatrolError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize project configuration
    pub fn init_project() -> Result<PathBuf> {
        let project_dir = Self::project_dir();
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, Self::default_project_config())?;
            info!("Created project config: {}", config_path.display());
        }

        Ok(project_dir)
    }

    /// Check if project is initialized
    pub fn is_project_initialized() -> bool {
        Self::project_dir().exists()
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Generate default project config content (TOML)
    fn default_project_config() -> String {
        r#"# Patrol Project Configuration
# Project-specific settings that override global defaults.

version = "1.0"

# LLM backend for the AI-quality agent
[llm]
provider = "scripted"
timeout_secs = 300

# Alerting thresholds
[alerts]
min_success_rate = 95.0
min_performance_score = 80
min_accessibility_score = 90
min_security_score = 90

# Suite execution
[run]
agent_timeout_secs = 120
default_trigger = "manual"

# Trend analytics
[trends]
window = 30

# Report archive
[archive]
enabled = true
path = "reports.db"
retention = 500
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_file_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[run]\nagent_timeout_secs = 45\n\n[trends]\nwindow = 10\n"
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.run.agent_timeout_secs, 45);
        assert_eq!(config.trends.window, 10);
        // Untouched sections keep their defaults.
        assert_eq!(config.llm.provider, "scripted");
        assert_eq!(config.alerts.min_security_score, 90);
    }

    #[test]
    fn invalid_file_config_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[trends]\nwindow = 0\n").unwrap();
        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = ConfigLoader::load_from_file(Path::new("/nonexistent/patrol.toml")).unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn default_project_template_parses() {
        let parsed: PatrolConfig = toml::from_str(&ConfigLoader::default_project_config()).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.run.default_trigger, "manual");
    }
}

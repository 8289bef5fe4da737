//! Language-Model Collaborator
//!
//! The AI-quality agent consumes the language-model backend through one
//! narrow contract: `generate_response(prompt, context) -> text`. Providers
//! must have bounded latency; callers wrap calls with their own timeout
//! (`timeout::with_timeout`).
//!
//! ## Modules
//!
//! - `http`: OpenAI-compatible HTTP backend with retry and endpoint checks
//! - `scripted`: deterministic canned responses for offline runs and tests

mod http;
mod scripted;
pub mod timeout;

pub use http::HttpProvider;
pub use scripted::ScriptedProvider;
pub use timeout::{with_timeout, with_timeout_map};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{PatrolError, Result};

/// Shared LLM provider type for concurrent access across agents.
pub type SharedProvider = Arc<dyn LlmProvider>;

/// LLM provider contract consumed by the core
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a free-text response for a prompt with structured context
    async fn generate_response(&self, prompt: &str, context: &Value) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Configuration for LLM providers
///
/// API keys are never serialized to output and are redacted in debug output.
/// The HTTP provider converts the key to SecretString internally.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider type: "http", "scripted"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation
    pub temperature: f32,
    /// API key; never serialized to output
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    1024
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "scripted".to_string(),
            model: None,
            timeout_secs: crate::constants::network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
            api_key: None,
            api_base: None,
            max_tokens: 1024,
        }
    }
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "http" => Ok(Arc::new(HttpProvider::new(config.clone())?)),
        "scripted" => Ok(Arc::new(ScriptedProvider::supportive())),
        _ => Err(PatrolError::Config(format!(
            "Unknown provider: {}. Supported: http, scripted",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let config = ProviderConfig {
            api_key: Some("sk-very-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn create_scripted_provider() {
        let provider = create_provider(&ProviderConfig::default()).unwrap();
        assert_eq!(provider.name(), "scripted");
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = ProviderConfig {
            provider: "telepathy".to_string(),
            ..Default::default()
        };
        assert!(create_provider(&config).is_err());
    }
}

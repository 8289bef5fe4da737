//! HTTP LLM Provider
//!
//! Talks to any OpenAI-compatible chat-completions endpoint. Retries
//! transient failures with exponential backoff and validates the endpoint
//! URL before use.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{LlmProvider, ProviderConfig};
use crate::constants::network;
use crate::types::{PatrolError, Result};

const DEFAULT_API_BASE: &str = "http://localhost:11434/v1";
const DEFAULT_MODEL: &str = "llama3:latest";

/// OpenAI-compatible HTTP provider with secure API key handling
pub struct HttpProvider {
    api_key: Option<SecretString>,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl HttpProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Self::validate_endpoint(&api_base)?;

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_key = config
            .api_key
            .or_else(|| std::env::var("PATROL_LLM_API_KEY").ok())
            .map(SecretString::from);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PatrolError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Validate endpoint URL: only http/https, warn for non-localhost hosts.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            PatrolError::Config(format!("Invalid LLM endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(PatrolError::Config(format!(
                "LLM endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str() {
            if !matches!(host, "localhost" | "127.0.0.1" | "::1") {
                warn!(
                    "LLM endpoint is not localhost: {}. Ensure this is intentional.",
                    host
                );
            }
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn build_request(&self, prompt: &str, context: &Value) -> ChatCompletionRequest {
        let system_content = if context.is_null() {
            "You are a supportive wellness assistant.".to_string()
        } else {
            format!(
                "You are a supportive wellness assistant. Conversation context:\n{}",
                serde_json::to_string_pretty(context)
                    .unwrap_or_else(|_| context.to_string())
            )
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_content,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        }
    }

    async fn request_once(&self, request: &ChatCompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                PatrolError::Llm(format!(
                    "Failed to connect to LLM endpoint at {}. Is the server running?",
                    self.api_base
                ))
            } else {
                PatrolError::Llm(format!("LLM request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PatrolError::Llm(format!(
                "LLM API error ({}): {}",
                status, body
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PatrolError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PatrolError::Llm("LLM response contained no choices".to_string()))
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn generate_response(&self, prompt: &str, context: &Value) -> Result<String> {
        debug!(model = %self.model, "Sending chat completion request");

        let request = self.build_request(prompt, context);

        (|| async { self.request_once(&request).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(network::BASE_DELAY_MS))
                    .with_max_times(network::MAX_LLM_RETRIES),
            )
            .when(|e: &PatrolError| matches!(e, PatrolError::Llm(_)))
            .notify(|e: &PatrolError, delay: Duration| {
                warn!(delay_ms = delay.as_millis() as u64, "Retrying LLM request: {}", e);
            })
            .await
    }

    fn name(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                warn!("LLM endpoint check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("LLM endpoint not reachable: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

//! Chat-completions client for OpenAI-compatible providers (Groq by default)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::LlmError;
use crate::config::LlmConfig;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

// ============ Provider Configuration ============

/// Configuration for an LLM API provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL for the API (e.g., "https://api.groq.com/openai/v1")
    pub base_url: String,
    /// API key for bearer authentication; when unset it is looked up in
    /// `api_key_env` on every request
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Request timeout; `None` leaves the HTTP client default in place
    pub request_timeout: Option<Duration>,
}

impl ProviderConfig {
    /// Create a Groq provider configuration
    pub fn groq(api_key: String) -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_string(),
            api_key: Some(api_key),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: None,
        }
    }

    /// Build a provider from the `[llm]` config section. A missing key is not
    /// an error here; requests fail with `MissingApiKey` until it is set.
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: read_key(&config.api_key_env),
            api_key_env: config.api_key_env.clone(),
            model: config.model.clone(),
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Key to send, falling back to the environment
    pub fn resolve_api_key(&self) -> Result<String, LlmError> {
        self.api_key
            .clone()
            .or_else(|| read_key(&self.api_key_env))
            .ok_or_else(|| LlmError::MissingApiKey(self.api_key_env.clone()))
    }

    pub fn has_api_key(&self) -> bool {
        self.resolve_api_key().is_ok()
    }
}

fn read_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}

// ============ Messages ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage>,
    model: &'a str,
}

/// Anything that can turn a (system role, user prompt) pair into text.
///
/// The tracker only talks to this trait; `ChatClient` is the HTTP
/// implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// HTTP chat-completions client
#[derive(Clone)]
pub struct ChatClient {
    client: Arc<Client>,
    provider: ProviderConfig,
}

impl ChatClient {
    pub fn new(provider: ProviderConfig) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(timeout) = provider.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: Arc::new(builder.build()?),
            provider,
        })
    }

    /// Create client from the `[llm]` config section
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(ProviderConfig::from_config(config))
    }

    /// Get the provider configuration
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Send a chat completion request with the given messages
    pub async fn send(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let api_key = self.provider.resolve_api_key()?;
        let request = ChatRequest {
            messages,
            model: &self.provider.model,
        };

        debug!("LLM request to {} with model {}", self.provider.base_url, self.provider.model);

        let response = self.client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: crate::truncate_safe(&body, 500).to_string(),
            });
        }

        let body = response.text().await?;
        extract_content(&body)
    }
}

#[async_trait]
impl CompletionBackend for ChatClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.send(vec![ChatMessage::system(system), ChatMessage::user(prompt)]).await
    }
}

/// Pull `choices[0].message.content` out of a raw response body.
///
/// Content may be a plain string or an array of `{"type":"text"}` parts.
pub(crate) fn extract_content(body: &str) -> Result<String, LlmError> {
    let raw: Value = serde_json::from_str(body.trim()).map_err(|e| {
        LlmError::Malformed(format!("{} (body: {})", e, crate::truncate_safe(body, 200)))
    })?;

    let content = raw
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"));

    match content {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Array(parts)) => Ok(parts
            .iter()
            .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("")),
        _ => Err(LlmError::Malformed("no choices[0].message.content in response".to_string())),
    }
}

//! Model client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the summary model client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether summary generation is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Base URL of the model gateway
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Provider id passed in message requests
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    /// Model id passed in message requests
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Maximum characters of post content to send per request
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:4096".to_string()
}

fn default_provider_id() -> String {
    "zhipu".to_string()
}

fn default_model_id() -> String {
    "glm-4.6".to_string()
}

fn default_max_content_chars() -> usize {
    12000
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl LlmConfig {
    /// Base default without env overrides (used internally to avoid recursion).
    fn base_default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            provider_id: default_provider_id(),
            model_id: default_model_id(),
            max_content_chars: default_max_content_chars(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENABLED`: "true" or "false"
    /// - `LLM_ENDPOINT`: gateway base URL
    /// - `LLM_PROVIDER_ID`: provider id
    /// - `LLM_MODEL_ID`: model id
    /// - `LLM_MAX_CONTENT_CHARS`: max post chars to send
    /// - `LLM_TIMEOUT_SECS`: request timeout
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("LLM_ENABLED") {
            self.enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }
        if let Ok(val) = std::env::var("LLM_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("LLM_PROVIDER_ID") {
            self.provider_id = val;
        }
        if let Ok(val) = std::env::var("LLM_MODEL_ID") {
            self.model_id = val;
        }
        if let Ok(val) = std::env::var("LLM_MAX_CONTENT_CHARS") {
            if let Ok(n) = val.parse() {
                self.max_content_chars = n;
            }
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.timeout_secs = n;
            }
        }
        self
    }
}

//! HTTP client for the session-based model gateway.
//!
//! The gateway exposes `POST /session` to open a conversation and
//! `POST /session/{id}/message` to exchange messages. Responses carry a
//! list of parts whose text segments are concatenated.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::config::LlmConfig;

/// Errors from the model client.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Summary generation is disabled")]
    Disabled,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    title: &'a str,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    id: String,
}

#[derive(Serialize)]
struct ModelRef<'a> {
    #[serde(rename = "providerID")]
    provider_id: &'a str,
    #[serde(rename = "modelID")]
    model_id: &'a str,
}

#[derive(Serialize)]
struct MessagePart<'a> {
    #[serde(rename = "type")]
    part_type: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    model: ModelRef<'a>,
    system: &'a str,
    parts: Vec<MessagePart<'a>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

/// Client over the model gateway.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Open a conversation session and return its id.
    pub async fn create_session(&self, title: &str) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        let url = format!("{}/session", self.config.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&CreateSessionRequest { title })
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let session: CreateSessionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        debug!(session_id = %session.id, "created model session");
        Ok(session.id)
    }

    /// Send one message in a session and return the concatenated text of
    /// the reply parts.
    pub async fn send_message(
        &self,
        session_id: &str,
        system: &str,
        text: &str,
    ) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        let truncated = self.truncate_content(text);
        let request = MessageRequest {
            model: ModelRef {
                provider_id: &self.config.provider_id,
                model_id: &self.config.model_id,
            },
            system,
            parts: vec![MessagePart {
                part_type: "text",
                text: truncated,
            }],
        };

        let url = format!("{}/session/{}/message", self.config.endpoint, session_id);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let message: MessageResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let combined: String = message
            .parts
            .iter()
            .filter(|p| p.part_type == "text")
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if combined.is_empty() {
            return Err(LlmError::Parse("Empty model response".to_string()));
        }

        Ok(combined)
    }

    /// Truncate content to configured maximum (UTF-8 safe).
    fn truncate_content<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= self.config.max_content_chars {
            return text;
        }
        let mut end = self.config.max_content_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_limit(max_chars: usize) -> LlmClient {
        let config = LlmConfig {
            enabled: true,
            endpoint: "http://localhost:4096".to_string(),
            provider_id: "zhipu".to_string(),
            model_id: "glm-4.6".to_string(),
            max_content_chars: max_chars,
            timeout_secs: 5,
        };
        LlmClient::new(config).unwrap()
    }

    #[test]
    fn test_truncate_short_content_unchanged() {
        let client = client_with_limit(100);
        assert_eq!(client.truncate_content("hello"), "hello");
    }

    #[test]
    fn test_truncate_respects_utf8_boundary() {
        let client = client_with_limit(4);
        // Each character is 3 bytes; cutting at 4 must back up to 3.
        let text = "你好吗";
        let truncated = client.truncate_content(text);
        assert_eq!(truncated, "你");
    }

    #[tokio::test]
    async fn test_disabled_client_refuses() {
        let mut config = LlmConfig::default();
        config.enabled = false;
        let client = LlmClient::new(config).unwrap();
        let err = client.create_session("t").await.unwrap_err();
        assert!(matches!(err, LlmError::Disabled));
    }
}

//! Anthropic Messages API client

use crate::config::BackendSettings;
use crate::error::{ConfigError, Error, LlmError};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client
pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    max_tokens: u32,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client, failing fast when no API key is configured
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, Error> {
        let api_key = settings
            .anthropic_api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingCredential("ANTHROPIC_API_KEY".to_string()))?;

        Ok(Self {
            api_key,
            base_url: settings.anthropic_base_url.trim_end_matches('/').to_string(),
            max_tokens: settings.max_tokens,
            timeout_secs: settings.timeout_secs,
            client: super::http_client(settings.timeout_secs)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    fn into_text(self) -> Option<String> {
        self.content.into_iter().find_map(|block| block.text)
    }
}

#[async_trait::async_trait]
impl super::LlmProvider for AnthropicClient {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, Error> {
        let body = MessagesRequest {
            model,
            max_tokens: self.max_tokens,
            system,
            messages: [Message {
                role: "user",
                content: user,
            }],
        };

        debug!("POST {}/v1/messages [model: {}, prompt: {} chars]", self.base_url, model, user.len());

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| super::transport_error("anthropic", self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = super::retry_after(&response);
            let body = response.text().await.unwrap_or_default();
            return Err(super::status_error("anthropic", status, retry_after, &body));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            Error::Llm(LlmError::InvalidResponse {
                backend: "anthropic".to_string(),
                details: e.to_string(),
            })
        })?;

        parsed.into_text().ok_or_else(|| {
            Error::Llm(LlmError::InvalidResponse {
                backend: "anthropic".to_string(),
                details: "no text content block".to_string(),
            })
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

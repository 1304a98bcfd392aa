//! OpenAI chat completions client

use crate::config::BackendSettings;
use crate::error::{ConfigError, Error, LlmError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI chat completions client
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    max_tokens: u32,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client, failing fast when no API key is configured
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, Error> {
        let api_key = settings
            .openai_api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingCredential("OPENAI_API_KEY".to_string()))?;

        Ok(Self {
            api_key,
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            max_tokens: settings.max_tokens,
            timeout_secs: settings.timeout_secs,
            client: super::http_client(settings.timeout_secs)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

#[async_trait::async_trait]
impl super::LlmProvider for OpenAiClient {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, Error> {
        let body = CompletionRequest {
            model,
            max_tokens: self.max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        debug!(
            "POST {}/v1/chat/completions [model: {}, prompt: {} chars]",
            self.base_url,
            model,
            user.len()
        );

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| super::transport_error("openai", self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = super::retry_after(&response);
            let body = response.text().await.unwrap_or_default();
            return Err(super::status_error("openai", status, retry_after, &body));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            Error::Llm(LlmError::InvalidResponse {
                backend: "openai".to_string(),
                details: e.to_string(),
            })
        })?;

        parsed.into_text().ok_or_else(|| {
            Error::Llm(LlmError::InvalidResponse {
                backend: "openai".to_string(),
                details: "no choices returned".to_string(),
            })
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

//! Ollama chat client for locally hosted models

use super::openai::ChatMessage;
use crate::config::BackendSettings;
use crate::error::{ConfigError, Error, LlmError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ollama HTTP client
pub struct OllamaClient {
    host: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client, rejecting an empty or non-http(s) host up front
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, Error> {
        let host = settings.ollama_host.trim().trim_end_matches('/').to_string();
        validate_host(&host)?;

        Ok(Self {
            host,
            timeout_secs: settings.timeout_secs,
            client: super::http_client(settings.timeout_secs)?,
        })
    }
}

fn validate_host(host: &str) -> Result<(), Error> {
    let invalid = || {
        Error::Config(ConfigError::InvalidEndpoint {
            backend: "ollama".to_string(),
            endpoint: host.to_string(),
        })
    };

    if host.is_empty() {
        return Err(invalid());
    }
    let url = reqwest::Url::parse(host).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

#[async_trait::async_trait]
impl super::LlmProvider for OllamaClient {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, Error> {
        let body = ChatRequest {
            model,
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
            stream: false,
        };

        debug!("POST {}/api/chat [model: {}, prompt: {} chars]", self.host, model, user.len());

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| super::transport_error("ollama", self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(super::status_error("ollama", status, None, &body));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            Error::Llm(LlmError::InvalidResponse {
                backend: "ollama".to_string(),
                details: e.to_string(),
            })
        })?;

        Ok(parsed.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

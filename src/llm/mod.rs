//! LLM backend abstraction and implementations
//!
//! Supports a closed set of text-generation backends (Anthropic, OpenAI,
//! Ollama) over HTTP. Each backend implements the LlmProvider trait and is
//! selected by the `Backend` enum, never by name lookup at call time.

pub mod anthropic;
pub mod invoke;
pub mod ollama;
pub mod openai;
pub mod registry;

use crate::error::{ConfigError, Error, LlmError};
use std::fmt;
use std::str::FromStr;

pub use invoke::{invoke, parse_json_object, Invocation};
pub use registry::ClientRegistry;

/// Common trait for LLM backends
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one system + user prompt pair and return the raw response text
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, Error>;

    /// Get the backend name (e.g., "anthropic", "ollama")
    fn name(&self) -> &str;
}

/// Supported text-generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Anthropic,
    OpenAi,
    Ollama,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Anthropic, Backend::OpenAi, Backend::Ollama];

    pub fn tag(&self) -> &'static str {
        match self {
            Backend::Anthropic => "anthropic",
            Backend::OpenAi => "openai",
            Backend::Ollama => "ollama",
        }
    }

    /// Models offered for selection; not enforced
    pub fn known_models(&self) -> &'static [&'static str] {
        match self {
            Backend::Anthropic => &["claude-haiku-4-5", "claude-sonnet-4-5"],
            Backend::OpenAi => &["gpt-5.2", "gpt-4.1"],
            Backend::Ollama => &["gemma3:4b", "deepseek-r1:1.5b"],
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Backend::Anthropic),
            "openai" => Ok(Backend::OpenAi),
            "ollama" => Ok(Backend::Ollama),
            _ => Err(Error::Config(ConfigError::UnknownBackend(tag.to_string()))),
        }
    }
}

/// Map a non-success HTTP status to the matching transport error
pub(crate) fn status_error(
    backend: &str,
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> Error {
    match status.as_u16() {
        401 | 403 => Error::Llm(LlmError::AuthenticationFailed(backend.to_string())),
        429 => Error::Llm(LlmError::RateLimitExceeded {
            backend: backend.to_string(),
            retry_after,
        }),
        503 => Error::Llm(LlmError::ModelUnavailable(backend.to_string())),
        code => Error::Llm(LlmError::RequestFailed {
            backend: backend.to_string(),
            source: format!(
                "HTTP {}: {}",
                code,
                body.chars().take(200).collect::<String>()
            ),
        }),
    }
}

/// Map a reqwest send failure, keeping timeouts and refused connections distinct
pub(crate) fn transport_error(backend: &str, timeout_secs: u64, err: reqwest::Error) -> Error {
    let source = if err.is_timeout() {
        format!("Timeout after {}s", timeout_secs)
    } else if err.is_connect() {
        format!("Could not connect: {}", err)
    } else {
        err.to_string()
    };
    Error::Llm(LlmError::RequestFailed {
        backend: backend.to_string(),
        source,
    })
}

/// Read the `retry-after` header as whole seconds
pub(crate) fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Build the shared HTTP client for one backend
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Config(ConfigError::HttpClient(e.to_string())))
}

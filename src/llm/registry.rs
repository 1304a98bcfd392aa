//! Process-wide registry of backend clients.
//!
//! Built once at startup and passed by reference. Each backend's client is
//! constructed on first use and reused afterwards; a backend whose
//! credentials are missing only fails when it is actually selected.

use super::anthropic::AnthropicClient;
use super::ollama::OllamaClient;
use super::openai::OpenAiClient;
use super::{Backend, LlmProvider};
use crate::config::BackendSettings;
use crate::error::Error;
use std::sync::{Arc, OnceLock};
use tracing::debug;

pub struct ClientRegistry {
    settings: BackendSettings,
    anthropic: OnceLock<Arc<dyn LlmProvider>>,
    openai: OnceLock<Arc<dyn LlmProvider>>,
    ollama: OnceLock<Arc<dyn LlmProvider>>,
}

impl ClientRegistry {
    pub fn new(settings: BackendSettings) -> Self {
        Self {
            settings,
            anthropic: OnceLock::new(),
            openai: OnceLock::new(),
            ollama: OnceLock::new(),
        }
    }

    /// Pre-seed a backend with an existing provider (alternate transports, tests)
    pub fn with_provider(self, backend: Backend, provider: Arc<dyn LlmProvider>) -> Self {
        // A fresh registry has empty slots, so this set always lands.
        let _ = self.slot(backend).set(provider);
        self
    }

    /// Get the client for a backend, constructing it on first use
    pub fn provider(&self, backend: Backend) -> Result<Arc<dyn LlmProvider>, Error> {
        let slot = self.slot(backend);
        if let Some(existing) = slot.get() {
            return Ok(Arc::clone(existing));
        }

        debug!("Constructing {} client", backend);
        let built: Arc<dyn LlmProvider> = match backend {
            Backend::Anthropic => Arc::new(AnthropicClient::from_settings(&self.settings)?),
            Backend::OpenAi => Arc::new(OpenAiClient::from_settings(&self.settings)?),
            Backend::Ollama => Arc::new(OllamaClient::from_settings(&self.settings)?),
        };

        // If another caller won the race, keep theirs.
        Ok(Arc::clone(slot.get_or_init(|| built)))
    }

    fn slot(&self, backend: Backend) -> &OnceLock<Arc<dyn LlmProvider>> {
        match backend {
            Backend::Anthropic => &self.anthropic,
            Backend::OpenAi => &self.openai,
            Backend::Ollama => &self.ollama,
        }
    }
}

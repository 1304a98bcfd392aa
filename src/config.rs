use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_template_path() -> PathBuf {
    PathBuf::from("documents").join("template_report.docx")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            template_path: default_template_path(),
        }
    }
}

/// Size and length bounds applied to untrusted input and model output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
    #[serde(default = "default_max_document_text_chars")]
    pub max_document_text_chars: usize,
    #[serde(default = "default_max_table_bytes")]
    pub max_table_bytes: usize,
    #[serde(default = "default_max_field_chars")]
    pub max_field_chars: usize,
    #[serde(default = "default_max_suggestion_items")]
    pub max_suggestion_items: usize,
    #[serde(default = "default_max_suggestion_chars")]
    pub max_suggestion_chars: usize,
    #[serde(default = "default_max_report_text_chars")]
    pub max_report_text_chars: usize,
}

fn default_max_document_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_document_text_chars() -> usize {
    50_000
}

fn default_max_table_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_max_field_chars() -> usize {
    4_000
}

fn default_max_suggestion_items() -> usize {
    10
}

fn default_max_suggestion_chars() -> usize {
    2_000
}

fn default_max_report_text_chars() -> usize {
    5_000
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_document_bytes: default_max_document_bytes(),
            max_document_text_chars: default_max_document_text_chars(),
            max_table_bytes: default_max_table_bytes(),
            max_field_chars: default_max_field_chars(),
            max_suggestion_items: default_max_suggestion_items(),
            max_suggestion_chars: default_max_suggestion_chars(),
            max_report_text_chars: default_max_report_text_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout() -> u64 {
    60
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            anthropic_base_url: default_anthropic_base_url(),
            openai_base_url: default_openai_base_url(),
            ollama_host: default_ollama_host(),
        }
    }
}

/// Backend endpoints and credentials, resolved once at startup.
///
/// A missing key is not an error here; it only fails when the backend
/// that needs it is first used.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub openai_base_url: String,
    pub ollama_host: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl BackendSettings {
    /// Build settings from config, letting the process environment supply
    /// credentials and override the Ollama host.
    pub fn from_env(llm: &LlmConfig) -> Self {
        Self {
            anthropic_api_key: non_empty_env("ANTHROPIC_API_KEY"),
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            anthropic_base_url: llm.anthropic_base_url.clone(),
            openai_base_url: llm.openai_base_url.clone(),
            ollama_host: env::var("OLLAMA_HOST").unwrap_or_else(|_| llm.ollama_host.clone()),
            max_tokens: llm.max_tokens,
            timeout_secs: llm.timeout_secs,
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        let llm = LlmConfig::default();
        Self {
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_base_url: llm.anthropic_base_url,
            openai_base_url: llm.openai_base_url,
            ollama_host: llm.ollama_host,
            max_tokens: llm.max_tokens,
            timeout_secs: llm.timeout_secs,
        }
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from file, returns defaults if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Template location, with `TEMPLATE_PATH` taking precedence
    pub fn template_path(&self) -> PathBuf {
        env::var("TEMPLATE_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.store.template_path.clone())
    }
}

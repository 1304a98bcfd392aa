//! Error types for policy-audit
//!
//! Every failure a stage can surface is one of:
//! - Format errors (unreadable document or table, user-correctable)
//! - Validation errors (model output outside its contract)
//! - Configuration errors (credentials, backend tag, report template)
//! - LLM transport errors (timeouts, HTTP failures of one backend call)
//! - Invocation exhaustion (no valid JSON after every attempt)
//! - Artifact path safety and lookup
//! - File I/O

use std::fmt;
use std::io;

/// Result type alias for policy-audit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for policy-audit
#[derive(Debug)]
pub enum Error {
    /// Malformed input document or table
    Format(FormatError),
    /// Model output violates the output contract
    Validation(ValidationError),
    /// Operator-correctable configuration problem
    Config(ConfigError),
    /// A single backend call failed at the transport level
    Llm(LlmError),
    /// The model never produced valid, complete JSON
    InvocationExhausted { attempts: u32, last_failure: String },
    /// Artifact filename resolves outside the store root
    PathSafety(String),
    /// Artifact filename is well-formed but no such file exists
    ArtifactNotFound(String),
    /// I/O errors
    Io(IoError),
}

/// Input document and table errors
#[derive(Debug)]
pub enum FormatError {
    /// Source document exceeds the size limit
    DocumentTooLarge { size: usize, max: usize },
    /// Source document does not start with the PDF signature
    NotAPdf,
    /// Text could not be extracted from the source document
    DocumentUnreadable(String),
    /// Table input exceeds the size limit
    TableTooLarge { size: usize, max: usize },
    /// Table bytes could not be parsed as a workbook
    TableUnreadable(String),
    /// A header the stage depends on is absent
    MissingColumn(String),
    /// A column the stage would append is already present
    ColumnExists(String),
}

/// Model output contract violations
#[derive(Debug)]
pub enum ValidationError {
    /// `match` is not one of yes/no/partial
    InvalidMatch(String),
    /// `rewritten_suggestions` is neither a string nor a list
    InvalidRewrittenSuggestions(String),
}

/// Configuration errors (never retried)
#[derive(Debug)]
pub enum ConfigError {
    /// Backend tag outside the supported set
    UnknownBackend(String),
    /// Required credential variable is unset or empty
    MissingCredential(String),
    /// Backend endpoint is not a usable URL
    InvalidEndpoint { backend: String, endpoint: String },
    /// HTTP client could not be constructed
    HttpClient(String),
    /// Report template file does not exist
    TemplateMissing(String),
    /// Report template exists but is not a readable docx
    TemplateUnreadable { path: String, details: String },
}

/// LLM transport errors for a single backend call
#[derive(Debug)]
pub enum LlmError {
    /// HTTP request failed (network timeout, connection refused)
    RequestFailed { backend: String, source: String },
    /// API response malformed (undecodable body, no content)
    InvalidResponse { backend: String, details: String },
    /// Rate limit exceeded (429 response)
    RateLimitExceeded { backend: String, retry_after: Option<u64> },
    /// API authentication failed (invalid key)
    AuthenticationFailed(String),
    /// Model unavailable (503, model offline)
    ModelUnavailable(String),
}

/// File I/O errors
#[derive(Debug)]
pub enum IoError {
    /// Failed to read file
    FileReadFailed { path: String, source: io::Error },
    /// Failed to write file
    FileWriteFailed { path: String, source: io::Error },
    /// Failed to create directory
    DirectoryCreateFailed { path: String, source: io::Error },
    /// Failed to encode an output document
    EncodeFailed { path: String, details: String },
    /// Other I/O error
    Other(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(e) => write!(f, "Format error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Llm(e) => write!(f, "LLM error: {}", e),
            Error::InvocationExhausted {
                attempts,
                last_failure,
            } => write!(
                f,
                "LLM failed to return valid JSON with required fields after {} attempts (last failure: {})",
                attempts, last_failure
            ),
            Error::PathSafety(name) => write!(f, "Invalid artifact filename: {}", name),
            Error::ArtifactNotFound(name) => write!(f, "Artifact not found: {}", name),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::DocumentTooLarge { size, max } => write!(
                f,
                "Document is {} bytes, exceeding the maximum of {} MB",
                size,
                max / 1024 / 1024
            ),
            FormatError::NotAPdf => write!(f, "Uploaded file is not a valid PDF"),
            FormatError::DocumentUnreadable(details) => {
                write!(f, "Could not extract text from the document: {}", details)
            }
            FormatError::TableTooLarge { size, max } => write!(
                f,
                "Table is {} bytes, exceeding the maximum of {} MB",
                size,
                max / 1024 / 1024
            ),
            FormatError::TableUnreadable(details) => {
                write!(f, "Could not open the XLSX table: {}", details)
            }
            FormatError::MissingColumn(name) => {
                write!(f, "Table has no '{}' column", name)
            }
            FormatError::ColumnExists(name) => {
                write!(f, "Table already has a '{}' column", name)
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidMatch(value) => {
                write!(f, "LLM returned unexpected match value: {:?}", value)
            }
            ValidationError::InvalidRewrittenSuggestions(kind) => {
                write!(f, "rewritten_suggestions must be a list, got {}", kind)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownBackend(tag) => write!(f, "Unknown backend: {:?}", tag),
            ConfigError::MissingCredential(var) => write!(f, "{} is not set", var),
            ConfigError::InvalidEndpoint { backend, endpoint } => {
                write!(f, "{} endpoint is not a valid URL: {:?}", backend, endpoint)
            }
            ConfigError::HttpClient(details) => {
                write!(f, "Failed to build HTTP client: {}", details)
            }
            ConfigError::TemplateMissing(path) => {
                write!(f, "Report template not found: {}", path)
            }
            ConfigError::TemplateUnreadable { path, details } => {
                write!(f, "Could not open the report template {}: {}", path, details)
            }
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::RequestFailed { backend, source } => {
                write!(f, "Request to {} failed: {}", backend, source)
            }
            LlmError::InvalidResponse { backend, details } => {
                write!(f, "Invalid response from {}: {}", backend, details)
            }
            LlmError::RateLimitExceeded {
                backend,
                retry_after,
            } => match retry_after {
                Some(seconds) => write!(
                    f,
                    "Rate limit exceeded for {} (retry after {} seconds)",
                    backend, seconds
                ),
                None => write!(f, "Rate limit exceeded for {}", backend),
            },
            LlmError::AuthenticationFailed(backend) => {
                write!(f, "Authentication failed for {}", backend)
            }
            LlmError::ModelUnavailable(backend) => {
                write!(f, "Model unavailable: {}", backend)
            }
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::FileReadFailed { path, source } => {
                write!(f, "Failed to read {}: {}", path, source)
            }
            IoError::FileWriteFailed { path, source } => {
                write!(f, "Failed to write {}: {}", path, source)
            }
            IoError::DirectoryCreateFailed { path, source } => {
                write!(f, "Failed to create directory {}: {}", path, source)
            }
            IoError::EncodeFailed { path, details } => {
                write!(f, "Failed to encode {}: {}", path, details)
            }
            IoError::Other(source) => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(IoError::FileReadFailed { source, .. })
            | Error::Io(IoError::FileWriteFailed { source, .. })
            | Error::Io(IoError::DirectoryCreateFailed { source, .. })
            | Error::Io(IoError::Other(source)) => Some(source),
            _ => None,
        }
    }
}

impl std::error::Error for FormatError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for LlmError {}
impl std::error::Error for IoError {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(IoError::Other(err))
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Self {
        Error::Format(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<LlmError> for Error {
    fn from(err: LlmError) -> Self {
        Error::Llm(err)
    }
}

impl Error {
    /// Check if a fresh backend call could succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Llm(LlmError::RequestFailed { .. })
                | Error::Llm(LlmError::InvalidResponse { .. })
                | Error::Llm(LlmError::RateLimitExceeded { .. })
                | Error::Llm(LlmError::ModelUnavailable(_))
        )
    }

    /// Check if the failure is the caller's to correct (a 4xx at a request layer)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Format(_)
                | Error::Validation(_)
                | Error::PathSafety(_)
                | Error::ArtifactNotFound(_)
        )
    }

    /// Get formatted context string for logging
    pub fn context(&self) -> String {
        match self {
            Error::Format(e) => format!("format: {}", e),
            Error::Validation(e) => format!("validation: {}", e),
            Error::Config(e) => format!("config: {}", e),
            Error::Llm(e) => format!("llm: {}", e),
            Error::InvocationExhausted { attempts, .. } => {
                format!("llm: exhausted after {} attempts", attempts)
            }
            Error::PathSafety(name) => format!("artifact: unsafe path {}", name),
            Error::ArtifactNotFound(name) => format!("artifact: missing {}", name),
            Error::Io(e) => format!("io: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_format_error_display() {
        let err = Error::Format(FormatError::DocumentTooLarge {
            size: 20 * 1024 * 1024,
            max: 10 * 1024 * 1024,
        });
        assert_eq!(
            err.to_string(),
            "Format error: Document is 20971520 bytes, exceeding the maximum of 10 MB"
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = Error::Validation(ValidationError::InvalidMatch("maybe".to_string()));
        assert_eq!(
            err.to_string(),
            "Validation error: LLM returned unexpected match value: \"maybe\""
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::Config(ConfigError::MissingCredential(
            "ANTHROPIC_API_KEY".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "Configuration error: ANTHROPIC_API_KEY is not set"
        );
    }

    #[test]
    fn test_llm_error_display() {
        let err = Error::Llm(LlmError::RateLimitExceeded {
            backend: "openai".to_string(),
            retry_after: Some(60),
        });
        assert_eq!(
            err.to_string(),
            "LLM error: Rate limit exceeded for openai (retry after 60 seconds)"
        );
    }

    #[test]
    fn test_exhausted_display_mentions_attempts() {
        let err = Error::InvocationExhausted {
            attempts: 3,
            last_failure: "missing fields: match".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("3 attempts"));
        assert!(message.contains("missing fields: match"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(IoError::Other(_))));
    }

    #[test]
    fn test_is_retryable() {
        let retryable = Error::Llm(LlmError::RequestFailed {
            backend: "ollama".to_string(),
            source: "Timeout after 60s".to_string(),
        });
        assert!(retryable.is_retryable());

        let auth = Error::Llm(LlmError::AuthenticationFailed("anthropic".to_string()));
        assert!(!auth.is_retryable());

        let config = Error::Config(ConfigError::UnknownBackend("grok".to_string()));
        assert!(!config.is_retryable());
    }

    #[test]
    fn test_is_client_error() {
        assert!(Error::PathSafety("../etc/passwd".to_string()).is_client_error());
        assert!(Error::Format(FormatError::NotAPdf).is_client_error());
        assert!(
            Error::Validation(ValidationError::InvalidMatch("x".to_string())).is_client_error()
        );
        assert!(!Error::Config(ConfigError::TemplateMissing("t.docx".to_string()))
            .is_client_error());
        assert!(!Error::InvocationExhausted {
            attempts: 3,
            last_failure: String::new()
        }
        .is_client_error());
    }

    #[test]
    fn test_context() {
        let err = Error::ArtifactNotFound("20240101_120000_Acme_SOC2.xlsx".to_string());
        assert_eq!(
            err.context(),
            "artifact: missing 20240101_120000_Acme_SOC2.xlsx"
        );
    }

    #[test]
    fn test_error_source_chain() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::Io(IoError::Other(io_err));
        assert!(err.source().is_some());
    }
}

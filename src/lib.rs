pub mod artifact;
pub mod commands;
pub mod config;
pub mod document;
pub mod docx;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod stages;
pub mod table;
pub mod validate;

pub use artifact::ArtifactStore;
pub use error::{Error, Result};
pub use llm::{Backend, ClientRegistry, LlmProvider};
pub use stages::Pipeline;

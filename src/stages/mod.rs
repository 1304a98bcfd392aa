//! Stage orchestrators: analyze → rewrite → report.
//!
//! Each stage reads its inputs, drives prompt building, model invocation
//! and validation row by row (strictly in input order), and writes its
//! outputs as new artifacts. Stages share nothing but the artifact store;
//! the only link between them is the filename convention in
//! [`crate::artifact`]. Any row failure aborts the whole stage before
//! anything is written.

pub mod analyze;
pub mod report;
pub mod rewrite;

pub use analyze::{AnalysisRecord, AnalyzeOutcome, AnalyzeRequest};
pub use report::ReportOutcome;
pub use rewrite::{RewriteOutcome, RewriteRecord, RewriteRequest};

use crate::artifact::ArtifactStore;
use crate::config::{BackendSettings, Config, Limits};
use crate::document::{DocumentExtractor, PdfTextExtractor};
use crate::error::{Error, IoError, Result};
use crate::llm::ClientRegistry;
use serde::Serialize;
use std::path::PathBuf;

/// Everything a stage needs: store, backends, limits, template location
pub struct Pipeline {
    store: ArtifactStore,
    registry: ClientRegistry,
    limits: Limits,
    max_attempts: u32,
    template_path: PathBuf,
    extractor: Box<dyn DocumentExtractor>,
}

impl Pipeline {
    pub fn new(
        store: ArtifactStore,
        registry: ClientRegistry,
        limits: Limits,
        max_attempts: u32,
        template_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            registry,
            limits,
            max_attempts,
            template_path: template_path.into(),
            extractor: Box::new(PdfTextExtractor),
        }
    }

    /// Build from loaded configuration, reading credentials from the environment
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = ArtifactStore::open(&config.store.output_dir)?;
        let registry = ClientRegistry::new(BackendSettings::from_env(&config.llm));
        Ok(Self::new(
            store,
            registry,
            config.limits.clone(),
            config.llm.max_attempts,
            config.template_path(),
        ))
    }

    /// Swap the document text extractor
    pub fn with_extractor(mut self, extractor: Box<dyn DocumentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

/// Pretty-printed JSON for a stage's result array
fn encode_json<T: Serialize>(records: &[T], filename: &str) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(records).map_err(|e| {
        Error::Io(IoError::EncodeFailed {
            path: filename.to_string(),
            details: e.to_string(),
        })
    })
}

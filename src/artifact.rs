//! Flat, append-only artifact store and the naming convention that chains
//! stages together.
//!
//! Every stage output is named `{YYYYMMDD}_{HHMMSS}_{suffix}...`. Analyze
//! derives the suffix from the client name and the uploaded table's stem;
//! later stages carry it forward from their input's filename, so the
//! client/standard identity survives the chain without any lookup table.

use crate::error::{Error, IoError, Result};
use chrono::{Local, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of the "now" used for artifact timestamps
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub struct ArtifactStore {
    root: PathBuf,
    clock: Clock,
}

impl ArtifactStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|source| {
            Error::Io(IoError::DirectoryCreateFailed {
                path: root.display().to_string(),
                source,
            })
        })?;
        let root = root.canonicalize().map_err(|source| {
            Error::Io(IoError::FileReadFailed {
                path: root.display().to_string(),
                source,
            })
        })?;

        Ok(Self {
            root,
            clock: Arc::new(|| Local::now().naive_local()),
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Second-resolution local timestamp, `YYYYMMDD_HHMMSS`
    pub fn timestamp(&self) -> String {
        (self.clock)().format(TIMESTAMP_FORMAT).to_string()
    }

    /// Resolve a filename strictly inside the store.
    ///
    /// Anything other than a single plain filename, or anything that
    /// canonicalizes outside the root (e.g. through a symlink), is a
    /// `PathSafety` error whether or not the target exists.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        check_plain_filename(filename)?;

        let candidate = self.root.join(filename);
        if !candidate.is_file() {
            return Err(Error::ArtifactNotFound(filename.to_string()));
        }

        let resolved = candidate
            .canonicalize()
            .map_err(|_| Error::ArtifactNotFound(filename.to_string()))?;
        if !resolved.starts_with(&self.root) {
            warn!("Artifact {} resolves outside the store", filename);
            return Err(Error::PathSafety(filename.to_string()));
        }

        Ok(resolved)
    }

    pub fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.resolve(filename)?;
        fs::read(&path).map_err(|source| {
            Error::Io(IoError::FileReadFailed {
                path: path.display().to_string(),
                source,
            })
        })
    }

    /// Write a new artifact; an existing file with the same name is never replaced
    pub fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        check_plain_filename(filename)?;
        let path = self.root.join(filename);

        let write_failed = |source| {
            Error::Io(IoError::FileWriteFailed {
                path: path.display().to_string(),
                source,
            })
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(write_failed)?;
        file.write_all(bytes).map_err(write_failed)?;

        debug!("Wrote artifact {} ({} bytes)", filename, bytes.len());
        Ok(path)
    }
}

fn check_plain_filename(filename: &str) -> Result<()> {
    let unsafe_name = || Error::PathSafety(filename.to_string());

    if filename.contains(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(unsafe_name());
    }
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(unsafe_name()),
    }
}

/// Replace everything but letters, digits, `_` and `-` with `_`, then trim `_`
pub fn sanitize_component(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Suffix for analyze outputs: `{client}_{table stem}`, both sanitized
pub fn analysis_suffix(client_name: &str, table_filename: &str) -> String {
    format!(
        "{}_{}",
        sanitize_component(client_name),
        sanitize_component(file_stem(table_filename))
    )
}

/// Recover the client/standard suffix from a previous stage's artifact name.
///
/// `20240101_120000_Acme_SOC2.xlsx` yields `Acme_SOC2`. The leading tokens
/// must really be an 8-digit date and a 6-digit time followed by something;
/// otherwise the whole stem is carried and a warning is logged.
pub fn carried_suffix(filename: &str) -> String {
    let stem = file_stem(filename);
    let mut parts = stem.splitn(3, '_');

    if let (Some(date), Some(time), Some(rest)) = (parts.next(), parts.next(), parts.next()) {
        if is_digits(date, 8) && is_digits(time, 6) && !rest.is_empty() {
            return rest.to_string();
        }
    }

    warn!(
        "Artifact name {:?} has no timestamp prefix; carrying the whole stem",
        filename
    );
    stem.to_string()
}

fn is_digits(token: &str, len: usize) -> bool {
    token.len() == len && token.bytes().all(|b| b.is_ascii_digit())
}

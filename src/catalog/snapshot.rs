//! Backbone snapshot files.
//!
//! Supported extensions:
//! - `.json` (`{version, created_at, usages}` as written by `CandidateIndex::to_json`)
//! - `.tsv`, `.txt` (one usage per row with a header line)
//! - either of the above with `.gz`

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::catalog::store::{CandidateIndex, CatalogError, IndexData};
use crate::core::usage::CandidateUsage;
use crate::parsing::tsv::{is_gzipped, open_reader, parse_backbone_tsv};

/// Bulk read of every current backbone usage
pub trait BackboneSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `CatalogError` if the backbone cannot be read.
    fn load(&self) -> Result<Vec<CandidateUsage>, CatalogError>;

    /// Where the backbone comes from, for logging
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Tsv,
}

impl SnapshotFormat {
    /// Detect the format from the file extension, ignoring a trailing `.gz`
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnsupportedFormat` for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let lower = path.to_string_lossy().to_lowercase();
        let stem = if is_gzipped(path) {
            lower.trim_end_matches(".gz").trim_end_matches(".bgz")
        } else {
            lower.as_str()
        };
        match stem.rsplit('.').next() {
            Some("json") => Ok(Self::Json),
            Some("tsv" | "txt") => Ok(Self::Tsv),
            _ => Err(CatalogError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A backbone snapshot on disk
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
    format: SnapshotFormat,
}

impl SnapshotFile {
    /// # Errors
    ///
    /// Returns `CatalogError::UnsupportedFormat` if the extension is not recognized.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let format = SnapshotFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot and build an index from it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if reading, parsing or building fails.
    pub fn load_index(&self) -> Result<CandidateIndex, CatalogError> {
        CandidateIndex::build(self.load()?)
    }
}

impl BackboneSource for SnapshotFile {
    fn load(&self) -> Result<Vec<CandidateUsage>, CatalogError> {
        debug!("Reading {:?} backbone snapshot {}", self.format, self.path.display());
        let mut reader = open_reader(&self.path)?;
        match self.format {
            SnapshotFormat::Json => {
                let mut content = String::new();
                reader.read_to_string(&mut content)?;
                let data: IndexData = serde_json::from_str(&content)?;
                Ok(data.usages)
            }
            SnapshotFormat::Tsv => parse_backbone_tsv(reader),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

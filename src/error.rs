use std::path::PathBuf;

use thiserror::Error;

/// The taxonomy of failures the core distinguishes.
///
/// `Decode`, `Metadata`, and `Processing` are per-file and non-fatal: the
/// orchestrator catches them, counts them into `Stats`, and moves on.
/// `Catalogue` failures during a single photo's transaction are likewise
/// per-file; a `Catalogue` failure during open/schema creation is fatal
/// and propagates out of `main` as an `anyhow::Error`. `Configuration`
/// always terminates before work starts. `Query` is returned to the HTTP
/// layer as a typed response, never unwinds. `Cancelled` surfaces when the
/// caller requests termination between files or between analysis passes.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("decode failed for {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("metadata extraction failed for {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("processing failed for {path}: {reason}")]
    Processing { path: PathBuf, reason: String },

    #[error("catalogue error: {0}")]
    Catalogue(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    /// The stable kind label used in statistics and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Decode { .. } => "decode",
            PipelineError::Metadata { .. } => "metadata",
            PipelineError::Processing { .. } => "processing",
            PipelineError::Catalogue(_) => "catalogue",
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Query(_) => "query",
            PipelineError::Cancelled => "cancelled",
        }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::Decode { path: path.into(), reason: reason.into() }
    }

    pub fn metadata(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::Metadata { path: path.into(), reason: reason.into() }
    }

    pub fn processing(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::Processing { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

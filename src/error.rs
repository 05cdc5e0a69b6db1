//! Error taxonomy for the organizing pipeline.
//!
//! Per-file and per-cluster errors (`ExtractionError`, `EmbeddingError`,
//! `LabelingError`) are absorbed by the orchestrator and reported as
//! warnings. Only [`PipelineError`] ends a run.

use std::path::PathBuf;
use thiserror::Error;

/// Listing the target directory failed. Always run-fatal.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("directory does not exist: {0}")]
    NotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cannot read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Text extraction failed for a single file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("document is password protected")]
    Encrypted,

    #[error("office document extraction failed: {0}")]
    Ooxml(String),

    #[error("CSV extraction failed: {0}")]
    Csv(String),

    #[error("extraction task aborted: {0}")]
    Join(String),
}

/// Embedding failed for a single input.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider error: {0}")]
    Provider(String),

    #[error("embedding contains non-finite components")]
    NonFinite,

    #[error("embedding dimension mismatch: got {got}, expected {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("provider returned {got} embeddings for {expected} inputs")]
    CountMismatch { got: usize, expected: usize },
}

/// Invalid vector data reached the cluster engine.
///
/// The orchestrator filters bad vectors before clustering, so this is an
/// internal failure rather than something a user can fix.
#[derive(Debug, Error, PartialEq)]
pub enum ClusteringError {
    #[error("vector {index} has non-finite components")]
    NonFinite { index: usize },

    #[error("vector {index} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        got: usize,
        expected: usize,
    },
}

/// Naming a single cluster failed. Always recovered with a fallback name.
#[derive(Debug, Error)]
pub enum LabelingError {
    #[error("generation model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("model output is not a usable folder name: {0:?}")]
    InvalidOutput(String),
}

/// Conditions that end a run in the `Failed` state.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("embedding model unavailable: {0}")]
    EmbeddingModelUnavailable(String),

    #[error("generation model unavailable: {0}")]
    GenerationModelUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("applying the plan failed: {0}")]
    Apply(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable machine-readable reason for the failure
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::Scan(_) => "scan-failed",
            PipelineError::EmbeddingModelUnavailable(_) => "embedding-model-unavailable",
            PipelineError::GenerationModelUnavailable(_) => "generation-model-unavailable",
            PipelineError::InvalidConfig(_) => "invalid-config",
            PipelineError::Apply(_) => "apply-failed",
            PipelineError::Internal(_) => "internal",
        }
    }
}

impl From<ClusteringError> for PipelineError {
    fn from(err: ClusteringError) -> Self {
        PipelineError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_reasons() {
        let scan = PipelineError::from(ScanError::NotFound(PathBuf::from("/nope")));
        assert_eq!(scan.reason(), "scan-failed");
        assert_eq!(
            PipelineError::EmbeddingModelUnavailable("x".into()).reason(),
            "embedding-model-unavailable"
        );
        assert_eq!(
            PipelineError::GenerationModelUnavailable("x".into()).reason(),
            "generation-model-unavailable"
        );
    }

    #[test]
    fn test_clustering_error_is_internal() {
        let err: PipelineError = ClusteringError::NonFinite { index: 3 }.into();
        assert_eq!(err.reason(), "internal");
        assert!(err.to_string().contains("vector 3"));
    }
}

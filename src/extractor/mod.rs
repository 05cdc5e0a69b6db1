//! Text extraction, dispatched on the detected [`FileKind`].
//!
//! The set of strategies is closed: every kind maps to exactly one arm of
//! [`ExtractorRegistry::extract`]. Binary kinds return at once without
//! opening the file; parse failures become `ExtractionStatus::Failed` and
//! never escape as errors.

pub mod kind;
pub mod office;
pub mod pdf;
pub mod text;

pub use kind::{detect_kind, kind_from_extension};

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::models::{ExtractionStatus, FileKind, FileMeta, TextFormat};
use crate::utils;
use tracing::debug;

/// Result of extracting one file
#[derive(Debug)]
pub struct Extraction {
    pub text: String,
    pub status: ExtractionStatus,
    pub error: Option<ExtractionError>,
}

impl Extraction {
    fn success(text: String) -> Self {
        Self {
            text,
            status: ExtractionStatus::Success,
            error: None,
        }
    }

    fn skipped(status: ExtractionStatus) -> Self {
        Self {
            text: String::new(),
            status,
            error: None,
        }
    }

    fn failed(error: ExtractionError) -> Self {
        Self {
            text: String::new(),
            status: ExtractionStatus::Failed,
            error: Some(error),
        }
    }
}

/// Maps a file kind to its extraction strategy
#[derive(Debug, Clone, Default)]
pub struct ExtractorRegistry {
    config: ExtractionConfig,
}

impl ExtractorRegistry {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Detect the kind of a scanned file (may read its first bytes)
    pub fn detect(&self, meta: &FileMeta) -> FileKind {
        detect_kind(meta, self.config.sniff_bytes)
    }

    /// Extract text from a file of the given kind
    ///
    /// The text is trimmed and head-truncated to `max_chars` characters.
    pub async fn extract(&self, meta: &FileMeta, kind: FileKind) -> Extraction {
        let result = match kind {
            FileKind::Binary(_) => return Extraction::skipped(ExtractionStatus::SkippedBinary),
            FileKind::Unsupported => return Extraction::skipped(ExtractionStatus::Unsupported),
            FileKind::Text(TextFormat::Plain) => {
                text::read_plain_text(&meta.path, self.config.max_chars).await
            }
            FileKind::Text(TextFormat::Csv) => {
                let path = meta.path.clone();
                let max_lines = self.config.csv_max_lines;
                let delimiter = if meta.extension.as_deref() == Some("tsv") {
                    b'\t'
                } else {
                    b','
                };
                run_blocking(move || text::read_csv_head(&path, max_lines, delimiter)).await
            }
            FileKind::Pdf => {
                let path = meta.path.clone();
                let max_pages = self.config.pdf_max_pages;
                run_blocking(move || pdf::extract_pdf(&path, max_pages)).await
            }
            FileKind::Office(format) => {
                let path = meta.path.clone();
                let config = self.config.clone();
                run_blocking(move || {
                    let bytes = std::fs::read(&path)?;
                    office::extract_office(&bytes, format, &config)
                })
                .await
            }
        };

        match result {
            Ok(text) => {
                let text = utils::truncate_chars(text.trim(), self.config.max_chars)
                    .trim_end()
                    .to_string();
                debug!(
                    "Extracted {} chars from {}",
                    text.chars().count(),
                    meta.path.display()
                );
                Extraction::success(text)
            }
            Err(e) => Extraction::failed(e),
        }
    }
}

/// Run a blocking parser off the async runtime; a panic becomes an error
async fn run_blocking<F>(f: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractionError::Join(e.to_string()))?
}

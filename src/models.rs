use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Metadata about a file in the filesystem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMeta {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// File extension (lowercase, without the dot)
    pub extension: Option<String>,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileMeta {
    /// Create a new FileMeta instance
    pub fn new(path: PathBuf, size: u64, extension: Option<String>, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            extension,
            modified,
        }
    }
}

/// Binary categories that are never read for content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BinaryCategory {
    Image,
    Video,
    Audio,
    Executable,
    Archive,
}

/// Office Open XML formats we can read
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OfficeFormat {
    /// Word-processor document
    Docx,
    /// Presentation
    Pptx,
    /// Spreadsheet
    Xlsx,
}

/// Text-like formats read straight from disk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TextFormat {
    Plain,
    Csv,
}

/// Detected kind of a file, which selects the extraction strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Office(OfficeFormat),
    Text(TextFormat),
    /// Binary fast path: bucketed by category, never opened
    Binary(BinaryCategory),
    /// Nothing we know how to read
    Unsupported,
}

/// Outcome of text extraction for one file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStatus {
    /// Not extracted yet
    Pending,
    Success,
    SkippedBinary,
    Unsupported,
    Failed,
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionStatus::Pending => "pending",
            ExtractionStatus::Success => "success",
            ExtractionStatus::SkippedBinary => "skipped-binary",
            ExtractionStatus::Unsupported => "unsupported",
            ExtractionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One file moving through the pipeline
///
/// Created when the directory is scanned. The text is set once by the
/// extractor; afterwards only the status can change, and only to `Failed`.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub meta: FileMeta,
    pub kind: FileKind,
    text: String,
    status: ExtractionStatus,
    error: Option<String>,
}

impl FileRecord {
    pub fn new(meta: FileMeta, kind: FileKind) -> Self {
        Self {
            meta,
            kind,
            text: String::new(),
            status: ExtractionStatus::Pending,
            error: None,
        }
    }

    /// Record the extractor result
    pub fn set_extraction(&mut self, text: String, status: ExtractionStatus, error: Option<String>) {
        debug_assert_eq!(self.status, ExtractionStatus::Pending);
        self.text = text;
        self.status = status;
        self.error = error;
    }

    /// Mark a later stage failure (embedding) for this file
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = ExtractionStatus::Failed;
        self.error = Some(reason.into());
    }

    pub fn path(&self) -> &std::path::Path {
        &self.meta.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> ExtractionStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// How the directory should be organized
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Content embeddings, clustering and generated folder names
    AiSemantic,
    /// One folder per file extension
    FileExtension,
    /// One folder per modification month (YYYY-MM)
    DateModified,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortMode::AiSemantic => "ai-semantic",
            SortMode::FileExtension => "file-extension",
            SortMode::DateModified => "date-modified",
        };
        f.write_str(s)
    }
}

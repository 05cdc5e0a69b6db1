use crate::constants::{DEFAULT_OLLAMA_URL, MIN_LABEL_LEN};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration loaded from settings.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub labeling: LabelingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Extracted text is head-truncated to this many characters
    pub max_chars: usize,
    /// Text shorter than this (after trimming) goes to the fallback bucket
    pub min_chars: usize,
    pub pdf_max_pages: usize,
    pub csv_max_lines: usize,
    pub docx_max_paragraphs: usize,
    pub pptx_max_slides: usize,
    pub xlsx_max_rows: usize,
    /// Bytes read when sniffing a file with an unknown extension
    pub sniff_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_chars: 4000,
            min_chars: 10,
            pdf_max_pages: 3,
            csv_max_lines: 30,
            docx_max_paragraphs: 50,
            pptx_max_slides: 6,
            xlsx_max_rows: 21,
            sniff_bytes: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "hashing" (offline, built in) or "ollama"
    pub provider: String,
    pub url: String,
    pub model: String,
    pub dims: usize,
    pub batch_size: usize,
    /// Input sent to the model is cut to this many characters
    pub max_input_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: "all-minilm".to_string(),
            dims: 384,
            batch_size: 16,
            max_input_chars: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "ollama", "local" (GGUF through llama.cpp, `llm` feature) or "disabled"
    pub provider: String,
    pub url: String,
    pub model: String,
    pub model_path: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub seed: u64,
    pub context_size: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: "llama3.2:3b".to_string(),
            model_path: "~/.local/share/sortwise/models/Llama-3.2-3B-Instruct-Q4_K_M.gguf"
                .to_string(),
            temperature: 0.0,
            max_tokens: 15,
            seed: 42,
            context_size: 2048,
        }
    }
}

impl LlmConfig {
    /// Model path with `~` and environment variables expanded
    pub fn expanded_model_path(&self) -> PathBuf {
        let expanded = shellexpand::full(&self.model_path)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.model_path.clone());
        PathBuf::from(expanded)
    }
}

/// Linkage criterion used when merging clusters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    #[default]
    Average,
    Complete,
    Single,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Merging stops once the closest pair is farther apart than this
    /// (cosine distance, 0..=2). Lower means more, tighter clusters.
    pub distance_threshold: f32,
    pub linkage: Linkage,
    /// Clusters above this size are flagged and summarized from a sample
    pub max_cluster_size: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.75,
            linkage: Linkage::Average,
            max_cluster_size: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    pub max_label_len: usize,
    /// Member files shown to the model per cluster
    pub sample_size: usize,
    /// Characters of each member's text included in the digest
    pub preview_chars: usize,
    pub max_digest_chars: usize,
    /// Keywords joined into a fallback name
    pub fallback_keywords: usize,
    /// Fail the run when the generation model cannot be loaded
    pub require_generation_model: bool,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            max_label_len: 50,
            sample_size: 5,
            preview_chars: 150,
            max_digest_chars: 1500,
            fallback_keywords: 2,
            require_generation_model: false,
        }
    }
}

/// Non-semantic rule for the fallback bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    #[default]
    Extension,
    Date,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent extraction/embedding units
    pub workers: usize,
    /// Capacity of the progress event channel
    pub event_buffer: usize,
    pub fallback: FallbackPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            event_buffer: 64,
            fallback: FallbackPolicy::Extension,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from default location or return defaults
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("SORTWISE_CONFIG") {
            return Self::from_file(path);
        }

        let default_paths = ["config/settings.toml", "~/.config/sortwise/settings.toml"];

        for path in default_paths {
            let path = PathBuf::from(shellexpand::tilde(path).into_owned());
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<(), String> {
        let threshold = self.clustering.distance_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 2.0 {
            return Err(format!(
                "clustering.distance_threshold must be in (0, 2], got {}",
                threshold
            ));
        }
        if self.pipeline.workers == 0 {
            return Err("pipeline.workers must be at least 1".to_string());
        }
        if self.pipeline.event_buffer == 0 {
            return Err("pipeline.event_buffer must be at least 1".to_string());
        }
        if self.embedding.batch_size == 0 {
            return Err("embedding.batch_size must be at least 1".to_string());
        }
        if self.embedding.dims == 0 {
            return Err("embedding.dims must be at least 1".to_string());
        }
        if self.labeling.max_label_len < MIN_LABEL_LEN {
            return Err(format!(
                "labeling.max_label_len must be at least {}, got {}",
                MIN_LABEL_LEN, self.labeling.max_label_len
            ));
        }
        if self.labeling.sample_size == 0 {
            return Err("labeling.sample_size must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.provider, "hashing");
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.clustering.linkage, Linkage::Average);
        assert_eq!(config.labeling.max_label_len, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"
[clustering]
distance_threshold = 0.5
linkage = "complete"

[pipeline]
fallback = "date"
"#,
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.clustering.distance_threshold, 0.5);
        assert_eq!(config.clustering.linkage, Linkage::Complete);
        assert_eq!(config.clustering.max_cluster_size, 50);
        assert_eq!(config.pipeline.fallback, FallbackPolicy::Date);
        assert_eq!(config.extraction.max_chars, 4000);
    }

    #[test]
    fn test_config_from_file_parse_error() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[clustering\nbroken").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.clustering.distance_threshold = 0.0;
        assert!(config.validate().is_err());
        config.clustering.distance_threshold = f32::NAN;
        assert!(config.validate().is_err());
        config.clustering.distance_threshold = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.pipeline.workers = 0;
        assert!(config.validate().unwrap_err().contains("workers"));
    }

    #[test]
    fn test_validate_label_len_minimum() {
        let mut config = Config::default();
        config.labeling.max_label_len = MIN_LABEL_LEN - 1;
        assert!(config.validate().unwrap_err().contains("max_label_len"));
        config.labeling.max_label_len = MIN_LABEL_LEN;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_expanded_model_path() {
        let mut llm = LlmConfig::default();
        llm.model_path = "/models/x.gguf".to_string();
        assert_eq!(llm.expanded_model_path(), PathBuf::from("/models/x.gguf"));
    }
}

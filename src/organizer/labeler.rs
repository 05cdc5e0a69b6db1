//! Folder names for clusters.
//!
//! The model sees a bounded digest of a few representative members, never
//! the full membership. When the model is missing, fails, or answers with
//! something unusable, the name is derived from keywords instead.

use crate::config::LabelingConfig;
use crate::error::LabelingError;
use crate::llm::LlmProvider;
use crate::models::FileRecord;
use crate::organizer::generator::{clean_model_output, fallback_name};
use crate::organizer::keywords::{keywords_from_path, top_keywords};
use crate::utils;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a file organizer. \
Task: Generate a short, concise folder name (max 3 words) for these files. \
Rules: No punctuation. Use underscores between words. PascalCase. No sentences. \
No explanation. No generic names like 'Files'. If unsure, output 'Documents'.";

/// A chosen name and where it came from
#[derive(Debug)]
pub struct Label {
    pub name: String,
    /// True when the generation model produced the name
    pub generated: bool,
    /// Why the fallback was used, when it was
    pub error: Option<LabelingError>,
}

pub struct Labeler {
    config: LabelingConfig,
}

impl Labeler {
    pub fn new(config: LabelingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LabelingConfig {
        &self.config
    }

    /// One line per sampled member, bounded in total length
    pub fn build_digest(&self, members: &[&FileRecord]) -> String {
        let lines: Vec<String> = members
            .iter()
            .take(self.config.sample_size)
            .map(|record| {
                let preview: String = utils::truncate_chars(record.text(), self.config.preview_chars)
                    .chars()
                    .map(|c| if c.is_whitespace() { ' ' } else { c })
                    .collect();
                format!("- {}: {}...", utils::display_name(record.path()), preview.trim())
            })
            .collect();

        utils::truncate_chars(&lines.join("\n"), self.config.max_digest_chars).to_string()
    }

    pub fn build_prompt(&self, digest: &str) -> String {
        format!("{}\n\nFiles:\n{}\n\nFolder Name:", SYSTEM_PROMPT, digest)
    }

    /// Ask the model for a name and validate its answer
    pub async fn generate(&self, model: &dyn LlmProvider, digest: &str) -> Result<String, LabelingError> {
        let prompt = self.build_prompt(digest);
        let raw = model
            .generate(&prompt)
            .await
            .map_err(|e| LabelingError::Generation(format!("{:#}", e)))?;
        debug!("Raw label from {}: {:?}", model.model_name(), raw);
        clean_model_output(&raw, self.config.max_label_len)
    }

    /// Keyword name over the members' texts and file names
    pub fn fallback(&self, cluster_id: usize, members: &[&FileRecord]) -> String {
        let sampled = &members[..members.len().min(self.config.sample_size)];
        let stems: Vec<String> = sampled
            .iter()
            .map(|r| keywords_from_path(r.path()).join(" "))
            .collect();
        let texts = sampled
            .iter()
            .map(|r| r.text())
            .chain(stems.iter().map(String::as_str));

        let keywords = top_keywords(texts, self.config.fallback_keywords);
        fallback_name(&keywords, cluster_id, self.config.max_label_len)
    }

    /// Name a cluster from its sampled members (closest to the centroid first)
    ///
    /// Never fails: every problem ends in the keyword fallback.
    pub async fn label(
        &self,
        model: Result<&dyn LlmProvider, &str>,
        cluster_id: usize,
        members: &[&FileRecord],
    ) -> Label {
        let outcome = match model {
            Ok(model) => {
                let digest = self.build_digest(members);
                self.generate(model, &digest).await
            }
            Err(reason) => Err(LabelingError::ModelUnavailable(reason.to_string())),
        };

        match outcome {
            Ok(name) => Label {
                name,
                generated: true,
                error: None,
            },
            Err(e) => {
                let name = self.fallback(cluster_id, members);
                warn!("Cluster {}: {}; using fallback name {}", cluster_id, e, name);
                Label {
                    name,
                    generated: false,
                    error: Some(e),
                }
            }
        }
    }
}

use crate::config::LlmConfig;
use crate::llm::LlmProvider;
use anyhow::{Context, Result};
use llama_cpp::standard_sampler::StandardSampler;
use llama_cpp::{LlamaModel, LlamaParams, SessionParams};
use std::path::PathBuf;

/// Local GGUF model run in-process through llama.cpp
///
/// Decoding is greedy, so output depends only on the prompt.
pub struct LocalLlmProvider {
    model: LlamaModel,
    name: String,
    context_size: u32,
    seed: u32,
    max_tokens: usize,
}

impl LocalLlmProvider {
    /// Load the model file; blocking, call from `spawn_blocking`
    pub fn load(config: &LlmConfig) -> Result<Self> {
        let path: PathBuf = config.expanded_model_path();
        if !path.exists() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        let model = LlamaModel::load_from_file(&path, LlamaParams::default())
            .with_context(|| format!("Failed to load model {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.model_path.clone());

        Ok(Self {
            model,
            name,
            context_size: config.context_size,
            seed: config.seed as u32,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for LocalLlmProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let model = self.model.clone();
        let prompt = prompt.to_string();
        let params = SessionParams {
            n_ctx: self.context_size,
            seed: self.seed,
            ..SessionParams::default()
        };
        let max_tokens = self.max_tokens;

        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut session = model
                .create_session(params)
                .context("Failed to create llama.cpp session")?;
            session
                .advance_context(&prompt)
                .context("Failed to feed prompt")?;
            let completion = session
                .start_completing_with(StandardSampler::new_greedy(), max_tokens)
                .context("Failed to start completion")?;
            Ok(completion.into_strings().collect::<String>())
        })
        .await
        .context("Generation task aborted")?
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

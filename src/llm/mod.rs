pub mod r#trait;
pub mod ollama;

#[cfg(feature = "llm")]
pub mod local;

#[cfg(feature = "llm")]
pub use local::LocalLlmProvider;
pub use ollama::OllamaLlmProvider;
pub use r#trait::LlmProvider;

use crate::config::LlmConfig;
use crate::pipeline::model::ModelLoader;
use anyhow::Result;
use std::sync::Arc;

/// Builds the generation model named in the configuration
pub struct ConfiguredGenerationLoader {
    config: LlmConfig,
}

impl ConfiguredGenerationLoader {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ModelLoader<dyn LlmProvider> for ConfiguredGenerationLoader {
    async fn load(&self) -> Result<Arc<dyn LlmProvider>> {
        match self.config.provider.as_str() {
            "ollama" => {
                let provider = OllamaLlmProvider::from_config(&self.config);
                provider.probe().await?;
                Ok(Arc::new(provider))
            }
            "local" => load_local(&self.config).await,
            "disabled" => anyhow::bail!("generation model disabled in configuration"),
            other => anyhow::bail!("unknown LLM provider '{}'", other),
        }
    }

    fn describe(&self) -> String {
        match self.config.provider.as_str() {
            "local" => format!("local ({})", self.config.model_path),
            other => format!("{} ({})", other, self.config.model),
        }
    }
}

#[cfg(feature = "llm")]
async fn load_local(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let config = config.clone();
    let provider = tokio::task::spawn_blocking(move || LocalLlmProvider::load(&config)).await??;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "llm"))]
async fn load_local(_config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    anyhow::bail!("LLM feature is not enabled. Compile with --features llm to use a local GGUF model.")
}

use anyhow::Result;

/// Trait for generative text models used to name folders
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt, returning the raw model output
    ///
    /// Implementations should decode deterministically (zero temperature or
    /// greedy sampling, fixed seed) so the same prompt yields the same text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}

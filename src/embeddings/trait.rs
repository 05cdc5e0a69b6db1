use anyhow::Result;

/// Trait for embedding providers that can compute semantic vectors from text
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute embedding vector from text content
    async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>>;

    /// Compute embeddings for several inputs, in input order
    ///
    /// Providers with a native batch endpoint should override this; the
    /// default embeds one input at a time.
    async fn compute_batch(&self, contents: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(contents.len());
        for content in contents {
            out.push(self.compute_embedding(content).await?);
        }
        Ok(out)
    }

    /// Get the dimension of embeddings produced by this provider
    fn dimension(&self) -> usize;

    /// Model identifier, for logs and run statistics
    fn model_name(&self) -> &str;

    /// Whether concurrent calls are allowed
    ///
    /// When false the embedder serializes every call through a single gate.
    fn is_thread_safe(&self) -> bool {
        true
    }
}

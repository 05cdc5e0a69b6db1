pub mod r#trait;
pub mod hashing;
pub mod ollama;

pub use hashing::HashingEmbeddingProvider;
pub use ollama::OllamaEmbeddingProvider;
pub use r#trait::EmbeddingProvider;

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use crate::pipeline::model::ModelLoader;
use crate::utils;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Outcome of embedding one input: `None` for empty text
pub type EmbedResult = Result<Option<Vec<f32>>, EmbeddingError>;

/// Batch-aware wrapper around an embedding provider
///
/// Keeps the input-to-vector correspondence: empty inputs are filtered out
/// before the provider is called and the results are merged back by index.
/// Every vector is checked for length and finiteness.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    gate: Option<Semaphore>,
    max_input_chars: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, max_input_chars: usize) -> Self {
        let gate = if provider.is_thread_safe() {
            None
        } else {
            Some(Semaphore::new(1))
        };
        Self {
            provider,
            gate,
            max_input_chars,
        }
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed a single text
    pub async fn embed(&self, text: &str) -> EmbedResult {
        let mut results = self.embed_batch(&[text]).await;
        results.pop().unwrap_or(Ok(None))
    }

    /// Embed several texts, one result per input in input order
    pub async fn embed_batch(&self, texts: &[&str]) -> Vec<EmbedResult> {
        let mut results: Vec<EmbedResult> = texts.iter().map(|_| Ok(None)).collect();

        let (indices, inputs): (Vec<usize>, Vec<String>) = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, t)| (i, utils::truncate_chars(t.trim(), self.max_input_chars).to_string()))
            .unzip();
        if inputs.is_empty() {
            return results;
        }

        let _permit = match &self.gate {
            Some(gate) => gate.acquire().await.ok(),
            None => None,
        };

        match self.provider.compute_batch(&inputs).await {
            Ok(vectors) if vectors.len() == inputs.len() => {
                for (index, vector) in indices.into_iter().zip(vectors) {
                    results[index] = self.check(vector).map(Some);
                }
            }
            outcome => {
                match outcome {
                    Ok(vectors) => warn!(
                        "{}",
                        EmbeddingError::CountMismatch {
                            got: vectors.len(),
                            expected: inputs.len(),
                        }
                    ),
                    Err(e) => warn!("Batch embedding failed, retrying one by one: {:#}", e),
                }
                for (index, input) in indices.into_iter().zip(inputs.iter()) {
                    results[index] = match self.provider.compute_embedding(input).await {
                        Ok(vector) => self.check(vector).map(Some),
                        Err(e) => Err(EmbeddingError::Provider(format!("{:#}", e))),
                    };
                }
            }
        }

        debug!("Embedded batch of {} inputs", texts.len());
        results
    }

    fn check(&self, vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
        let expected = self.provider.dimension();
        if vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                got: vector.len(),
                expected,
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite);
        }
        Ok(vector)
    }
}

/// Builds the embedding provider named in the configuration
pub struct ConfiguredEmbeddingLoader {
    config: EmbeddingConfig,
}

impl ConfiguredEmbeddingLoader {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ModelLoader<dyn EmbeddingProvider> for ConfiguredEmbeddingLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.config.provider.as_str() {
            "hashing" => Ok(Arc::new(HashingEmbeddingProvider::new(self.config.dims))),
            "ollama" => {
                let provider = OllamaEmbeddingProvider::new(
                    &self.config.url,
                    &self.config.model,
                    self.config.dims,
                );
                provider.probe().await?;
                Ok(Arc::new(provider))
            }
            other => anyhow::bail!("unknown embedding provider '{}'", other),
        }
    }

    fn describe(&self) -> String {
        match self.config.provider.as_str() {
            "hashing" => format!("hashing ({} dims)", self.config.dims),
            other => format!("{} ({})", other, self.config.model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `[len, 1.0]` per input; batch calls can be made to fail
    struct FakeProvider {
        fail_batch: bool,
        thread_safe: bool,
        batch_calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(fail_batch: bool) -> Self {
            Self {
                fail_batch,
                thread_safe: true,
                batch_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FakeProvider {
        async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>> {
            if content.contains("poison") {
                anyhow::bail!("cannot embed");
            }
            if content.contains("nan") {
                return Ok(vec![f32::NAN, 1.0]);
            }
            Ok(vec![content.len() as f32, 1.0])
        }

        async fn compute_batch(&self, contents: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_batch {
                anyhow::bail!("batch endpoint down");
            }
            let mut out = Vec::new();
            for c in contents {
                out.push(self.compute_embedding(c).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "fake"
        }

        fn is_thread_safe(&self) -> bool {
            self.thread_safe
        }
    }

    #[tokio::test]
    async fn test_empty_inputs_are_remerged_by_index() {
        let provider = Arc::new(FakeProvider::new(false));
        let embedder = Embedder::new(provider.clone(), 1000);
        let results = embedder.embed_batch(&["abc", "   ", "", "abcde"]).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().as_deref(), Some(&[3.0, 1.0][..]));
        assert!(results[1].as_ref().unwrap().is_none());
        assert!(results[2].as_ref().unwrap().is_none());
        assert_eq!(results[3].as_ref().unwrap().as_deref(), Some(&[5.0, 1.0][..]));
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_empty_skips_provider() {
        let provider = Arc::new(FakeProvider::new(false));
        let embedder = Embedder::new(provider.clone(), 1000);
        let results = embedder.embed_batch(&["", " \n\t"]).await;
        assert!(results.iter().all(|r| matches!(r, Ok(None))));
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_isolates_bad_item() {
        let embedder = Embedder::new(Arc::new(FakeProvider::new(true)), 1000);
        let results = embedder.embed_batch(&["good", "poison pill", "fine"]).await;

        assert!(matches!(results[0], Ok(Some(_))));
        assert!(matches!(results[1], Err(EmbeddingError::Provider(_))));
        assert!(matches!(results[2], Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_non_finite_vector_rejected() {
        let embedder = Embedder::new(Arc::new(FakeProvider::new(false)), 1000);
        let result = embedder.embed("nan here").await;
        assert!(matches!(result, Err(EmbeddingError::NonFinite)));
    }

    #[tokio::test]
    async fn test_input_truncated() {
        let embedder = Embedder::new(Arc::new(FakeProvider::new(false)), 4);
        let result = embedder.embed("abcdefgh").await.unwrap().unwrap();
        assert_eq!(result, vec![4.0, 1.0]);
    }

    #[tokio::test]
    async fn test_gated_provider_still_embeds() {
        let provider = Arc::new(FakeProvider {
            fail_batch: false,
            thread_safe: false,
            batch_calls: AtomicUsize::new(0),
        });
        let embedder = Embedder::new(provider, 1000);
        assert!(embedder.gate.is_some());
        let (a, b) = tokio::join!(embedder.embed("one"), embedder.embed("two"));
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_configured_loader() {
        let loader = ConfiguredEmbeddingLoader::new(EmbeddingConfig::default());
        let provider = loader.load().await.unwrap();
        assert_eq!(provider.dimension(), 384);

        let bad = ConfiguredEmbeddingLoader::new(EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        });
        assert!(bad.load().await.is_err());
    }
}

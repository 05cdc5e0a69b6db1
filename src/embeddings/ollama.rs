use crate::embeddings::EmbeddingProvider;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Embedding provider backed by a local Ollama server
pub struct OllamaEmbeddingProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
    dimension: AtomicUsize, // learned from the probe request at load time
}

impl OllamaEmbeddingProvider {
    pub fn new(base_url: &str, model: &str, dimension: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            dimension: AtomicUsize::new(dimension),
        }
    }

    /// Check the server answers and learn the model's real dimension
    pub async fn probe(&self) -> Result<()> {
        let embeddings = self
            .request(vec!["probe".to_string()])
            .await
            .with_context(|| format!("Ollama model '{}' is not usable", self.model))?;
        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            anyhow::bail!("Ollama returned an empty embedding for model '{}'", self.model);
        }

        let configured = self.dimension.swap(dimension, Ordering::Relaxed);
        if configured != dimension {
            info!(
                "Model '{}' produces {} dimensions (configured {}), using {}",
                self.model, dimension, configured, dimension
            );
        }
        Ok(())
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let request = OllamaEmbedRequest {
            model: &self.model,
            input,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama API returned error: {}", response.status());
        }

        let body: OllamaEmbedResponse = response
            .json()
            .await
            .context("Failed to parse Ollama embedding response")?;
        debug!("Ollama returned {} embeddings", body.embeddings.len());
        Ok(body.embeddings)
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>> {
        self.request(vec![content.to_string()])
            .await?
            .into_iter()
            .next()
            .context("Ollama returned no embedding")
    }

    async fn compute_batch(&self, contents: &[String]) -> Result<Vec<Vec<f32>>> {
        if contents.is_empty() {
            return Ok(Vec::new());
        }
        self.request(contents.to_vec()).await
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

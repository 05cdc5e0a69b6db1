use crate::config::LlmConfig;
use crate::llm::LlmProvider;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Generation through a local Ollama server
pub struct OllamaLlmProvider {
    base_url: String,
    model: String,
    temperature: f32,
    seed: u64,
    max_tokens: usize,
    client: reqwest::Client,
}

impl OllamaLlmProvider {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            seed: config.seed,
            max_tokens: config.max_tokens,
            client: reqwest::Client::new(),
        }
    }

    /// Check that the server is reachable and the model has been pulled
    pub async fn probe(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to Ollama")?;
        if !response.status().is_success() {
            anyhow::bail!("Ollama API returned error: {}", response.status());
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .context("Failed to parse Ollama model list")?;
        let wanted = self.model.as_str();
        let found = tags.models.iter().any(|m| {
            m.name == wanted || m.name.strip_suffix(":latest") == Some(wanted)
        });
        if !found {
            anyhow::bail!("model '{}' is not available in Ollama (try `ollama pull {}`)", wanted, wanted);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    seed: u64,
    num_predict: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Deserialize)]
struct OllamaModelTag {
    name: String,
}

#[async_trait::async_trait]
impl LlmProvider for OllamaLlmProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                seed: self.seed,
                num_predict: self.max_tokens,
            },
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

        let body: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Ollama generate response")?;
        debug!("Model output: {:?}", body.response);
        Ok(body.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

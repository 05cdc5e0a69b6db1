use crate::constants::STOP_WORDS;
use crate::embeddings::EmbeddingProvider;
use crate::utils;
use anyhow::Result;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Offline embedding provider based on feature hashing
///
/// Each word is hashed with blake3 into one of `dimension` buckets with a
/// hashed sign; counts are dampened with `1 + ln(tf)` and the vector is L2
/// normalized. No model file, no network, and the same text always gives
/// the same vector.
pub struct HashingEmbeddingProvider {
    dimension: usize,
    name: String,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            name: format!("feature-hashing-{}", dimension),
        }
    }

    /// Embed synchronously; shared by the single and batch paths
    pub fn embed_text(&self, content: &str) -> Result<Vec<f32>> {
        let tokens = utils::tokenize(content);
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for token in tokens.iter().filter(|t| !STOP_WORDS.contains(&t.as_str())) {
            *counts.entry(token.as_str()).or_default() += 1;
        }
        // Text made only of stop words still deserves a vector
        if counts.is_empty() {
            for token in &tokens {
                *counts.entry(token.as_str()).or_default() += 1;
            }
        }
        if counts.is_empty() {
            anyhow::bail!("no word tokens in input");
        }

        let mut vector = vec![0.0f32; self.dimension];
        for (token, count) in counts {
            let (bucket, sign) = self.bucket(token);
            vector[bucket] += sign * (1.0 + (count as f32).ln());
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            // Every token cancelled out in its bucket
            anyhow::bail!("input hashed to a zero vector");
        }
        for v in &mut vector {
            *v /= norm;
        }
        Ok(vector)
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let hash = blake3::hash(token.as_bytes());
        let bytes = hash.as_bytes();
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        let index = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>> {
        self.embed_text(content)
    }

    async fn compute_batch(&self, contents: &[String]) -> Result<Vec<Vec<f32>>> {
        contents.par_iter().map(|c| self.embed_text(c)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

//! Embedding generation.
//!
//! [`HttpEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint and
//! L2-normalizes the result, so cosine similarity downstream reduces to a dot
//! product. The HTTP client is built lazily on first use and reused.

use crate::rag::RetrievalError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;

/// Reference embedding dimension.
pub const EMBEDDING_DIM: usize = 768;

/// Deterministic text → dense vector function.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Embed one text into an L2-normalized vector of [`dimension`](Self::dimension).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Scale a vector to unit L2 norm. Zero vectors pass through unchanged.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    model: String,
    base_url: String,
    api_key: String,
    dimension: usize,
    client: OnceLock<Client>,
}

impl HttpEmbedder {
    /// Create an embedder with the reference dimension.
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            dimension: EMBEDDING_DIM,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> &Client {
        self.client.get_or_init(|| {
            Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("embedding client construction cannot fail with static options")
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let response = self
            .client()
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({"model": self.model, "input": text}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding(format!("{status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let row = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("empty embedding response".to_string()))?;

        if row.embedding.len() != self.dimension {
            return Err(RetrievalError::Embedding(format!(
                "expected dimension {}, got {}",
                self.dimension,
                row.embedding.len()
            )));
        }

        Ok(l2_normalize(row.embedding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_vectors() {
        let v = l2_normalize(vec![3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let v = l2_normalize(vec![0.0, 0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::EmbeddingSettings;
use crate::core::errors::RagError;

use super::Embedder;

/// Embedding client for OpenAI-compatible servers (`/v1/embeddings`).
#[derive(Clone)]
pub struct HttpEmbedder {
    base_url: String,
    model_id: String,
    dimension: usize,
    max_batch_size: usize,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(RagError::internal)?;

        Ok(Self {
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            model_id: settings.model_id.clone(),
            dimension: settings.dimension,
            max_batch_size: settings.max_batch_size,
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > self.max_batch_size {
            return Err(RagError::Embedding(format!(
                "batch of {} exceeds max batch size {}",
                texts.len(),
                self.max_batch_size
            )));
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model_id,
            "input": texts,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("embedding backend unreachable: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "embedding backend returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("malformed embedding response: {}", e)))?;

        let data = payload["data"]
            .as_array()
            .ok_or_else(|| RagError::Embedding("embedding response missing data".to_string()))?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let vals = item["embedding"].as_array().ok_or_else(|| {
                RagError::Embedding("embedding response entry missing vector".to_string())
            })?;
            let vector: Vec<f32> = vals
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            if vector.len() != self.dimension {
                return Err(RagError::Embedding(format!(
                    "backend returned dimension {}, expected {}",
                    vector.len(),
                    self.dimension
                )));
            }
            embeddings.push(vector);
        }

        // All-or-nothing: a short response invalidates the whole batch.
        if embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "backend returned {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        Ok(embeddings)
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::LlmSettings;
use crate::core::errors::RagError;

use super::provider::LlmProvider;
use super::types::GenerateRequest;

/// Chat-completion client for OpenAI-compatible servers
/// (`/v1/chat/completions`).
#[derive(Clone)]
pub struct OpenAiChatProvider {
    base_url: String,
    client: Client,
}

impl OpenAiChatProvider {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        model_id: &str,
    ) -> Result<String, RagError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::LlmProvider(format!("chat backend unreachable: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::LlmProvider(format!(
                "chat backend returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| RagError::LlmProvider(format!("malformed chat response: {}", e)))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if content.is_empty() {
            return Err(RagError::LlmProvider(
                "chat backend returned an empty completion".to_string(),
            ));
        }

        Ok(content)
    }
}

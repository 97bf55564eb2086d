use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::core::config::LlmSettings;
use crate::core::errors::RagError;

use super::provider::LlmProvider;
use super::types::GenerateRequest;

/// Result of a generation, noting which model actually answered.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub text: String,
    pub model_id: String,
    pub used_fallback: bool,
}

/// Generation with timeout and fallback policy.
///
/// The primary model gets two attempts (initial + one retry with jittered
/// backoff); after that the fallback model gets a single attempt. Each
/// attempt runs under the configured timeout. When everything fails, the
/// last error surfaces as `LlmProvider` for the workflow to degrade on.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    settings: LlmSettings,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: LlmSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    pub async fn generate(&self, mut request: GenerateRequest) -> Result<GenerationOutcome, RagError> {
        if request.temperature.is_none() {
            request.temperature = Some(self.settings.temperature);
        }
        if request.max_tokens.is_none() {
            request.max_tokens = Some(self.settings.max_tokens);
        }

        let primary = self.settings.primary_model.clone();
        let mut last_err = match self.attempt(&request, &primary).await {
            Ok(text) => {
                return Ok(GenerationOutcome {
                    text,
                    model_id: primary,
                    used_fallback: false,
                })
            }
            Err(err) => err,
        };

        tracing::warn!("Primary model '{}' failed, retrying: {}", primary, last_err);
        self.backoff().await;

        last_err = match self.attempt(&request, &primary).await {
            Ok(text) => {
                return Ok(GenerationOutcome {
                    text,
                    model_id: primary,
                    used_fallback: false,
                })
            }
            Err(err) => err,
        };

        let fallback = self.settings.fallback_model.clone();
        if fallback.is_empty() {
            return Err(last_err);
        }

        tracing::warn!(
            "Primary model '{}' failed twice, falling back to '{}': {}",
            primary,
            fallback,
            last_err
        );
        match self.attempt(&request, &fallback).await {
            Ok(text) => Ok(GenerationOutcome {
                text,
                model_id: fallback,
                used_fallback: true,
            }),
            Err(err) => {
                tracing::error!("Fallback model '{}' also failed: {}", fallback, err);
                Err(err)
            }
        }
    }

    async fn attempt(&self, request: &GenerateRequest, model_id: &str) -> Result<String, RagError> {
        let timeout = Duration::from_secs(self.settings.timeout_secs);
        match tokio::time::timeout(timeout, self.provider.generate(request.clone(), model_id)).await
        {
            Ok(result) => result,
            Err(_) => Err(RagError::LlmProvider(format!(
                "model '{}' timed out after {}s",
                model_id, self.settings.timeout_secs
            ))),
        }
    }

    async fn backoff(&self) {
        let jitter_ms = rand::rng().random_range(0..250);
        tokio::time::sleep(Duration::from_millis(250 + jitter_ms)).await;
    }
}

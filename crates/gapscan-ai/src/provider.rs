use crate::enhancer::{Enhancer, EnhancementTask};
use crate::output::enhanced_gaps_response_format;
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use gapscan_core::{GapScanError, LlmConfig, TenantId};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Enhancer backed by an OpenAI-compatible chat-completions endpoint.
/// One instance per tenant, created through the registry and held for the
/// whole run.
pub struct LlmEnhancer {
    config: LlmConfig,
    tenant: TenantId,
    client: Client,
}

impl LlmEnhancer {
    pub fn new(config: LlmConfig, tenant: TenantId) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            tenant,
            client,
        })
    }

    /// Send a request with retry logic and exponential backoff.
    async fn send_request(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            match self.try_request(messages).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        tracing::warn!(
                            tenant = %self.tenant,
                            "enhancer request failed (attempt {}/{}), retrying...",
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    async fn try_request(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            response_format: Some(enhanced_gaps_response_format()),
        };

        let mut builder = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .json(&request);

        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .context("Failed to send request to LLM provider")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("LLM provider error ({}): {}", status, error_text));
        }

        response
            .json::<ChatResponse>()
            .await
            .context("Failed to parse LLM provider response")
    }
}

#[async_trait]
impl Enhancer for LlmEnhancer {
    async fn execute(&self, task: &EnhancementTask) -> gapscan_core::Result<String> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: build_user_prompt(task),
            },
        ];

        let response = self
            .send_request(&messages)
            .await
            .map_err(|e| GapScanError::Agent(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GapScanError::Agent("provider returned no choices".to_string()))?;

        Ok(content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhancer_creation_succeeds_without_api_key() {
        // Local providers (Ollama, LM Studio) run unauthenticated.
        let enhancer = LlmEnhancer::new(LlmConfig::default(), TenantId::from("acme"));
        assert!(enhancer.is_ok());
    }

    #[test]
    fn request_serializes_without_null_fields() {
        let request = ChatRequest {
            model: "m".into(),
            messages: vec![],
            temperature: None,
            max_tokens: None,
            response_format: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("temperature").is_none());
        assert!(value.get("response_format").is_none());
    }
}

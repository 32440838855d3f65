use async_trait::async_trait;
use reqwest::Client;

use crate::config::OpenRouterConfig;
use crate::error::{GiftAdvisorError, Result};
use crate::models::{ChatRequest, ChatResponse, ProviderErrorBody};

const DEFAULT_UPSTREAM_ERROR: &str = "Failed to get recommendations";

#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse>;
}

/// Chat-completion transport for OpenRouter. One attempt per call, no retries.
pub struct OpenRouterTransport {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    referer: String,
    title: String,
}

impl OpenRouterTransport {
    pub fn new(cfg: &OpenRouterConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: cfg.api_url.clone(),
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            referer: cfg.referer.clone(),
            title: cfg.title.clone(),
        }
    }
}

#[async_trait]
impl Transport for OpenRouterTransport {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GiftAdvisorError::Configuration("OPENROUTER_API_KEY is not set".to_string())
        })?;

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(req)
            .send()
            .await
            .map_err(|e| {
                GiftAdvisorError::Upstream(format!("Failed to reach model provider: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            GiftAdvisorError::Upstream(format!("Failed to read model provider response: {e}"))
        })?;
        tracing::debug!(%status, body = %body, "Model provider raw response");

        if !status.is_success() {
            tracing::warn!(%status, "Model provider returned an error status");
            return Err(GiftAdvisorError::Upstream(provider_error_message(&body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Failed to parse model provider response: {}", e);
            GiftAdvisorError::Upstream("Invalid response format".to_string())
        })
    }
}

/// Pull `error.message` out of a provider error body, falling back to a generic message.
fn provider_error_message(body: &str) -> String {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => parsed
            .error
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPSTREAM_ERROR.to_string()),
        Err(e) => {
            tracing::warn!("Error parsing error response: {}", e);
            DEFAULT_UPSTREAM_ERROR.to_string()
        }
    }
}

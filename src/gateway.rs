use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{GiftDefaults, OpenRouterConfig};
use crate::error::{GiftAdvisorError, Result};
use crate::models::{ChatMessage, ChatRequest};
use crate::normalizer::PLACEHOLDER_IMAGE_URL;
use crate::transport::Transport;

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Ask the model for three fresh suggestions, skipping the first `offset`.
    async fn suggest(&self, query: &str, offset: u32) -> Result<String>;
}

pub struct OpenRouterGateway {
    tx: Arc<dyn Transport>,
    model: String,
    temperature: f32,
    max_tokens: i32,
    system_prompt: String,
}

impl OpenRouterGateway {
    pub fn new(tx: Arc<dyn Transport>, cfg: &OpenRouterConfig, defaults: &GiftDefaults) -> Self {
        Self {
            tx,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            system_prompt: system_prompt(defaults),
        }
    }
}

/// Fixed instructions pinning the model to the three-block record format.
pub fn system_prompt(defaults: &GiftDefaults) -> String {
    let currency = &defaults.currency;
    let minimum = &defaults.minimum_price;
    let details = format!(
        "Additional details: Age: {}, Event: {}, Gender: {}.",
        defaults.age, defaults.event, defaults.gender
    );
    let block = |n: u8| {
        format!(
            "{n}\n[Gift Item Name]\nPrice: [Currency] [a realistic price appropriate for the gift]\nImage: {PLACEHOLDER_IMAGE_URL}\nWhy: [One clear explanation sentence why the gift is a good choice]"
        )
    };

    format!(
        r#"You are a gift advisor AI.
Provide EXACTLY 3 general gift suggestions using the EXACT format below (no markdown, no extra text).
If the user's query specifies a currency (e.g., USD, EUR), use that; otherwise, default to {currency}.
{details}
Ensure the prices are realistic and significant (at least {currency} {minimum} or a comparable value).

IMPORTANT: Always use numbers 1, 2, 3 for each gift (never use higher numbers like 13, 14, 15).

Format (exactly as shown, using only numbers 1, 2, 3):
{}

{}

{}

Rules:
1. ALWAYS number gifts as 1, 2, and 3 (never higher numbers).
2. Use only these exact labels: "Price:", "Image:", "Why:".
3. Leave exactly one blank line between each item.
4. Do NOT include a real image URL (use the placeholder); it will be replaced with a real photo."#,
        block(1),
        block(2),
        block(3),
    )
}

/// Per-call instruction. The nonce keeps paginated calls from looking identical to the model.
pub fn user_prompt(query: &str, offset: u32, nonce: &str) -> String {
    format!(
        "Suggest 3 DIFFERENT gift ideas for: {query}. Skip the first {offset} suggestions. \
         Ensure that none of the suggestions are repeated from previous responses. \
         The request id is {nonce}."
    )
}

#[async_trait]
impl ModelGateway for OpenRouterGateway {
    async fn suggest(&self, query: &str, offset: u32) -> Result<String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        tracing::info!(offset, request_id = %nonce, "Requesting gift suggestions");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(user_prompt(query, offset, &nonce)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.tx.chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GiftAdvisorError::Upstream("No recommendations received".to_string()))
    }
}

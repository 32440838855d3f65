use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{GiftAdvisorError, Result};
use crate::models::{ErrorBody, GiftRecord, RecommendRequest, RecommendResponse};
use crate::normalizer::{IMAGE_LABEL, PRICE_LABEL, WHY_LABEL, split_blocks};

/// Suggestions requested per page; the offset advances by this much after each load.
pub const PAGE_SIZE: u32 = 6;
/// Distance from the bottom of the results pane, in pixels, that triggers the next page.
pub const SCROLL_THRESHOLD: f64 = 20.0;
pub const EMPTY_PROMPT_MESSAGE: &str = "Please provide some details about who you're shopping for.";

#[async_trait]
pub trait RecommendBackend: Send + Sync {
    /// Returns the `recommendations` text, or an error whose message is shown to the user.
    async fn recommend(&self, req: &RecommendRequest) -> Result<String>;
}

/// Talks to a running server's `/api/recommend`.
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/api/recommend", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl RecommendBackend for HttpBackend {
    async fn recommend(&self, req: &RecommendRequest) -> Result<String> {
        let response = self.client.post(&self.endpoint).json(req).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.details.unwrap_or(e.error))
                .unwrap_or_else(|_| "Failed to get recommendations".to_string());
            return Err(GiftAdvisorError::Upstream(message));
        }

        let parsed: RecommendResponse = serde_json::from_str(&body)?;
        Ok(parsed.recommendations)
    }
}

/// Pagination and display state for one user's results pane.
pub struct RecommendationSession<B> {
    backend: B,
    offset: u32,
    last_query: String,
    cards: Vec<GiftRecord>,
    error: Option<String>,
}

impl<B: RecommendBackend> RecommendationSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            offset: 0,
            last_query: String::new(),
            cards: Vec::new(),
            error: None,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn cards(&self) -> &[GiftRecord] {
        &self.cards
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Load the next page for `prompt`. A changed prompt starts over from offset 0.
    pub async fn submit(&mut self, prompt: &str) {
        if prompt.trim().is_empty() {
            self.show_error(EMPTY_PROMPT_MESSAGE.to_string());
            return;
        }

        if prompt != self.last_query {
            self.offset = 0;
            self.last_query = prompt.to_string();
            self.cards.clear();
        }

        let req = RecommendRequest {
            query: Some(prompt.to_string()),
            count: Some(PAGE_SIZE),
            offset: Some(self.offset),
        };
        debug!(offset = self.offset, "Requesting recommendations");

        match self.backend.recommend(&req).await {
            Ok(text) => {
                let page = parse_cards(&text);
                if self.offset == 0 {
                    self.cards = page;
                } else {
                    self.cards.extend(page);
                }
                self.error = None;
                self.offset += PAGE_SIZE;
            }
            Err(e) => {
                warn!(error = %e, "Recommendation request failed");
                let message = match e {
                    GiftAdvisorError::Upstream(msg) => msg,
                    other => other.to_string(),
                };
                self.show_error(message);
            }
        }
    }

    /// Scroll handler for the results pane; loads another page when near the bottom.
    /// Returns whether a load was triggered.
    pub async fn on_scroll(
        &mut self,
        prompt: &str,
        scroll_top: f64,
        scroll_height: f64,
        client_height: f64,
    ) -> bool {
        if scroll_top + client_height >= scroll_height - SCROLL_THRESHOLD {
            self.submit(prompt).await;
            true
        } else {
            false
        }
    }

    // the error panel replaces whatever cards were showing
    fn show_error(&mut self, message: String) {
        self.cards.clear();
        self.error = Some(message);
    }
}

/// Parse the `recommendations` text into cards. Blocks not starting with a digit are ignored.
pub fn parse_cards(text: &str) -> Vec<GiftRecord> {
    split_blocks(text)
        .into_iter()
        .filter(|block| block.trim_start().starts_with(|c: char| c.is_ascii_digit()))
        .map(|block| {
            let lines: Vec<&str> = block.lines().map(str::trim).collect();
            let field = |label: &str| {
                lines
                    .iter()
                    .find_map(|l| l.strip_prefix(label))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default()
            };
            GiftRecord {
                index: lines.first().and_then(|n| n.parse().ok()).unwrap_or(0),
                name: lines.get(1).map(|n| n.to_string()).unwrap_or_default(),
                price: field(PRICE_LABEL),
                image_url: field(IMAGE_LABEL),
                why: field(WHY_LABEL),
            }
        })
        .collect()
}

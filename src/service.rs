use std::sync::Arc;

use crate::config::Config;
use crate::error::{GiftAdvisorError, Result};
use crate::gateway::{ModelGateway, OpenRouterGateway};
use crate::images::{self, ImageSearch, UnsplashClient};
use crate::models::GiftRecord;
use crate::normalizer;
use crate::transport::{OpenRouterTransport, Transport};

/// Three validated records and the wire text they render to.
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub records: Vec<GiftRecord>,
    pub text: String,
}

/// Runs one recommendation request end to end: model call, normalization, image lookup.
#[derive(Clone)]
pub struct GiftAdvisor {
    gateway: Arc<dyn ModelGateway>,
    images: Arc<dyn ImageSearch>,
}

impl GiftAdvisor {
    pub fn new(gateway: Arc<dyn ModelGateway>, images: Arc<dyn ImageSearch>) -> Self {
        Self { gateway, images }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let transport = Arc::new(OpenRouterTransport::new(&cfg.openrouter));
        let gateway = OpenRouterGateway::new(
            transport as Arc<dyn Transport>,
            &cfg.openrouter,
            &cfg.gifts,
        );
        let images = UnsplashClient::new(&cfg.unsplash);
        Self::new(Arc::new(gateway), Arc::new(images))
    }

    pub async fn recommend(&self, query: &str, offset: u32) -> Result<Recommendations> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GiftAdvisorError::MissingQuery);
        }
        tracing::info!(query, offset, "Processing query");

        let raw = self.gateway.suggest(query, offset).await?;
        tracing::debug!(raw = %raw, "Raw model reply");

        let mut blocks = normalizer::normalize(&raw)?;
        images::enrich(self.images.as_ref(), &mut blocks).await;

        let text = normalizer::render(&blocks);
        normalizer::validate_final(&text)?;

        let records = blocks
            .into_iter()
            .map(normalizer::GiftBlock::into_record)
            .collect();
        Ok(Recommendations { records, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::MockImageSearch;
    use crate::normalizer::PLACEHOLDER_IMAGE_URL;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedGateway {
        reply: Result<String>,
        calls: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedGateway {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn suggest(&self, query: &str, offset: u32) -> Result<String> {
            self.calls
                .lock()
                .expect("gateway mutex poisoned")
                .push((query.to_string(), offset));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(GiftAdvisorError::Upstream(e.to_string())),
            }
        }
    }

    const READER_REPLY: &str = "**1**\nKindle Paperwhite\nPrice: USD 140\nImage: https://placeholder.com/400x300\nWhy: It holds thousands of books in one light device.\n\n\n2\nBook of the Month Subscription\nPrice: USD 60\nImage: https://placeholder.com/400x300 Why: A new hand-picked read arrives every month.\n\n5\nAdjustable Reading Lamp\nPrice: USD 75\nImage: https://placeholder.com/400x300\nWhy: Good light makes late-night reading easier.";

    fn no_images() -> Arc<MockImageSearch> {
        let mut images = MockImageSearch::new();
        images.expect_find_image().returning(|_| None);
        Arc::new(images)
    }

    #[tokio::test]
    async fn test_end_to_end_reader_query() {
        let gateway = Arc::new(ScriptedGateway::ok(READER_REPLY));
        let mut images = MockImageSearch::new();
        images
            .expect_find_image()
            .times(3)
            .returning(|name| Some(format!("https://img.example/{}.jpg", name.len())));
        let advisor = GiftAdvisor::new(gateway.clone(), Arc::new(images));

        let query = "gift for my sister who is 25 years old for their birthday with a budget between $50 and $150 who is interested in reading";
        let result = advisor.recommend(query, 0).await.unwrap();

        assert_eq!(result.records.len(), 3);
        for (i, record) in result.records.iter().enumerate() {
            assert_eq!(record.index, i + 1);
            assert!(!record.name.is_empty());
            assert!(!record.price.is_empty());
            assert!(!record.why.is_empty());
            assert!(record.image_url.starts_with("https://img.example/"));
        }
        let blocks = normalizer::split_blocks(&result.text);
        assert_eq!(blocks.len(), 3);
        assert!(blocks[2].starts_with("3\nAdjustable Reading Lamp\nPrice: USD 75\nImage: "));
        assert_eq!(gateway.calls.lock().unwrap()[0], (query.to_string(), 0));
    }

    #[tokio::test]
    async fn test_image_failure_keeps_placeholder() {
        let advisor = GiftAdvisor::new(Arc::new(ScriptedGateway::ok(READER_REPLY)), no_images());
        let result = advisor.recommend("reader", 6).await.unwrap();
        assert!(result.records.iter().all(|r| r.image_url == PLACEHOLDER_IMAGE_URL));
        assert_eq!(result.text.matches(PLACEHOLDER_IMAGE_URL).count(), 3);
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected_before_gateway() {
        let gateway = Arc::new(ScriptedGateway::ok(READER_REPLY));
        let advisor = GiftAdvisor::new(gateway.clone(), no_images());
        assert!(matches!(
            advisor.recommend("   ", 0).await,
            Err(GiftAdvisorError::MissingQuery)
        ));
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_model_output_skips_image_lookup() {
        let mut images = MockImageSearch::new();
        images.expect_find_image().never();
        let advisor = GiftAdvisor::new(
            Arc::new(ScriptedGateway::ok("1\nOnly one idea\nPrice: USD 5")),
            Arc::new(images),
        );
        assert!(matches!(
            advisor.recommend("anything", 0).await,
            Err(GiftAdvisorError::InvalidFormat { found: 1 })
        ));
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let gateway = ScriptedGateway {
            reply: Err(GiftAdvisorError::Upstream("Rate limit exceeded".to_string())),
            calls: Mutex::new(Vec::new()),
        };
        let advisor = GiftAdvisor::new(Arc::new(gateway), no_images());
        match advisor.recommend("anything", 0).await {
            Err(GiftAdvisorError::Upstream(msg)) => assert_eq!(msg, "Rate limit exceeded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::UnsplashConfig;
use crate::error::{GiftAdvisorError, Result};
use crate::models::PhotoSearchResponse;
use crate::normalizer::GiftBlock;

/// Best-effort photo lookup. `None` means "keep the placeholder".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn find_image(&self, query: &str) -> Option<String>;
}

pub struct UnsplashClient {
    client: Client,
    api_url: String,
    access_key: Option<String>,
    width: u32,
    height: u32,
}

impl UnsplashClient {
    pub fn new(cfg: &UnsplashConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: cfg.api_url.clone(),
            access_key: cfg.access_key.clone().filter(|k| !k.trim().is_empty()),
            width: cfg.width,
            height: cfg.height,
        }
    }

    async fn lookup(&self, query: &str) -> Result<Option<String>> {
        let access_key = self.access_key.as_deref().ok_or_else(|| {
            GiftAdvisorError::Configuration("UNSPLASH_ACCESS_KEY is not set".to_string())
        })?;

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("query", query), ("per_page", "1")])
            .header("Authorization", format!("Client-ID {access_key}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GiftAdvisorError::Upstream(format!(
                "Photo search returned {status}"
            )));
        }

        let data: PhotoSearchResponse = response.json().await?;
        if data.total == 0 {
            return Ok(None);
        }
        Ok(data
            .results
            .into_iter()
            .next()
            .map(|photo| with_sizing(&photo.urls.regular, self.width, self.height)))
    }
}

#[async_trait]
impl ImageSearch for UnsplashClient {
    async fn find_image(&self, query: &str) -> Option<String> {
        match self.lookup(query).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                info!(query, "No photo found");
                None
            }
            Err(e) => {
                warn!(query, error = %e, "Photo lookup failed, keeping placeholder");
                None
            }
        }
    }
}

/// Append crop parameters, picking `?` or `&` depending on whether the URL has a query.
pub fn with_sizing(url: &str, width: u32, height: u32) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}w={width}&h={height}&fit=crop")
}

/// Look up a photo for every block by gift name. Order is preserved; misses keep the placeholder.
pub async fn enrich(images: &dyn ImageSearch, blocks: &mut [GiftBlock]) {
    let names: Vec<String> = blocks.iter().map(|b| b.record().name.clone()).collect();
    let found = join_all(names.iter().map(|name| images.find_image(name))).await;

    for (block, url) in blocks.iter_mut().zip(found) {
        if let Some(url) = url {
            block.set_image(&url);
        }
    }
}

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::models::NewsItem;

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch the item the source currently considers latest
    async fn fetch_latest(&self) -> Result<NewsItem>;
}

/// Unauthenticated JSON endpoint returning a single news item
pub struct HttpNewsSource {
    pub client: Client,
    pub url: String,
}

impl HttpNewsSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl NewsSource for HttpNewsSource {
    async fn fetch_latest(&self) -> Result<NewsItem> {
        let res = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("news source non-success: {} body: {}", status, body);
        }
        let item: NewsItem = res
            .json()
            .await
            .with_context(|| format!("failed to decode news item from {}", self.url))?;
        if item.id.is_empty() {
            bail!("news item from {} has an empty id", self.url);
        }
        Ok(item)
    }
}

use async_trait::async_trait;
use reqwest::Client;

use crate::error::NewsError;
use crate::models::NewsItem;

/// Free-text news search.
#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<NewsItem>, NewsError>;
}

/// Google News RSS search restricted to Dutch results from the Netherlands.
pub struct GoogleNewsClient {
    client: Client,
    base_url: String,
}

impl GoogleNewsClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://news.google.com";

    pub fn new() -> Result<Self, NewsError> {
        Self::with_base_url(Self::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, NewsError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; JachtexamenBlog/1.0)")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn parse_feed(bytes: &[u8]) -> Result<Vec<NewsItem>, NewsError> {
        let feed = feed_rs::parser::parse(bytes).map_err(|e| NewsError::Feed(e.to_string()))?;

        Ok(feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.map(|t| t.content)?.trim().to_string();
                if title.is_empty() {
                    return None;
                }
                let description = entry
                    .summary
                    .map(|s| html2text::from_read(s.content.as_bytes(), 200))
                    .unwrap_or_default()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(NewsItem { title, description })
            })
            .collect())
    }
}

#[async_trait]
impl NewsSearch for GoogleNewsClient {
    async fn search(&self, query: &str) -> Result<Vec<NewsItem>, NewsError> {
        let url = format!(
            "{}/rss/search?q={}&hl=nl&gl=NL&ceid=NL:nl",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let items = Self::parse_feed(&body)?;
        tracing::debug!(query, count = items.len(), "News search returned items");
        Ok(items)
    }
}

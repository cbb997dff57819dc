//! News adapter backed by NewsAPI

use super::NewsAdapter;
use crate::api::{Article, NewsApiClient};
use crate::model::{NewsItem, ProviderResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct NewsApiAdapter {
    client: NewsApiClient,
}

impl NewsApiAdapter {
    pub fn new(client: NewsApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NewsAdapter for NewsApiAdapter {
    fn name(&self) -> &'static str {
        "newsapi"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, company_name: &str) -> ProviderResult<Vec<NewsItem>> {
        let articles = self.client.everything(company_name).await?;
        info!("Found {} articles for {}", articles.len(), company_name);
        Ok(articles.into_iter().map(to_news_item).collect())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn to_news_item(article: Article) -> NewsItem {
    NewsItem {
        title: non_blank(article.title).unwrap_or_default(),
        description: non_blank(article.description),
        url: non_blank(article.url).unwrap_or_default(),
        source: non_blank(article.source.name),
        published_at: article
            .published_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc)),
    }
}

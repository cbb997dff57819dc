//! NewsAPI client for company news

use crate::config::DEFAULT_NEWS_API_BASE_URL;
use crate::error::ApiError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const PROVIDER: &str = "NewsAPI";
const REMOVED_MARKER: &str = "[Removed]";

type Result<T> = std::result::Result<T, ApiError>;

/// Source attribution of an article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// NewsAPI article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    /// Publisher
    pub source: ArticleSource,
    pub author: Option<String>,
    /// Headline
    pub title: Option<String>,
    /// Short summary
    pub description: Option<String>,
    /// Article URL
    pub url: Option<String>,
    /// Publish time (ISO 8601)
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

/// NewsAPI client for the `/v2/everything` endpoint
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
    sort_by: String,
    page_size: u32,
}

impl NewsApiClient {
    /// Create a new NewsAPI client
    ///
    /// Defaults: English articles, newest first, five per request.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_NEWS_API_BASE_URL.to_string(),
            language: "en".to_string(),
            sort_by: "publishedAt".to_string(),
            page_size: 5,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = sort_by.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Search all articles mentioning `query`
    ///
    /// Articles withdrawn by their publisher are dropped; provider order is kept.
    #[instrument(skip(self))]
    pub async fn everything(&self, query: &str) -> Result<Vec<Article>> {
        let page_size = self.page_size.to_string();

        let response = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("language", self.language.as_str()),
                ("sortBy", self.sort_by.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // NewsAPI explains most failures in a JSON body, fall back to the raw text
        let parsed = match serde_json::from_str::<EverythingResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status {
                    provider: PROVIDER,
                    status: status.as_u16(),
                    body,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let articles = parse_everything(parsed)?;
        debug!("NewsAPI returned {} usable articles", articles.len());
        Ok(articles)
    }
}

fn parse_everything(response: EverythingResponse) -> Result<Vec<Article>> {
    if response.status != "ok" {
        let message = response
            .message
            .unwrap_or_else(|| format!("status {}", response.status));
        return Err(match response.code.as_deref() {
            Some("rateLimited") => ApiError::RateLimited {
                provider: PROVIDER,
                message,
            },
            _ => ApiError::Provider {
                provider: PROVIDER,
                message,
            },
        });
    }

    Ok(response
        .articles
        .into_iter()
        .filter(|a| a.title.as_deref().is_some_and(|t| t != REMOVED_MARKER))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> EverythingResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = NewsApiClient::new("test_key")
            .with_base_url("http://localhost:8080/")
            .with_page_size(10)
            .with_sort_by("relevancy");
        assert_eq!(client.api_key, "test_key");
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.page_size, 10);
        assert_eq!(client.sort_by, "relevancy");
        assert_eq!(client.language, "en");
    }

    #[test]
    fn test_parse_articles_keeps_order() {
        let articles = parse_everything(response(json!({
            "status": "ok",
            "totalResults": 3,
            "articles": [
                {
                    "source": { "id": "reuters", "name": "Reuters" },
                    "author": "Jane Doe",
                    "title": "Tesla beats delivery estimates",
                    "description": "Deliveries rose 20%",
                    "url": "https://example.com/a",
                    "publishedAt": "2024-04-02T13:45:00Z"
                },
                {
                    "source": { "id": null, "name": "[Removed]" },
                    "title": "[Removed]",
                    "url": "https://removed.com"
                },
                {
                    "source": { "id": null, "name": "Electrek" },
                    "title": "Tesla cuts prices again",
                    "description": null,
                    "url": "https://example.com/b",
                    "publishedAt": "2024-04-01T08:00:00Z"
                }
            ]
        })))
        .unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title.as_deref(), Some("Tesla beats delivery estimates"));
        assert_eq!(articles[0].source.name.as_deref(), Some("Reuters"));
        assert_eq!(articles[1].description, None);
    }

    #[test]
    fn test_parse_no_articles() {
        let articles = parse_everything(response(json!({
            "status": "ok",
            "totalResults": 0,
            "articles": []
        })))
        .unwrap();
        assert!(articles.is_empty());
    }

    #[test]
    fn test_parse_error_status() {
        let err = parse_everything(response(json!({
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid or incorrect."
        })))
        .unwrap_err();
        assert!(matches!(err, ApiError::Provider { .. }));
        assert!(err.to_string().contains("API key is invalid"));

        let err = parse_everything(response(json!({
            "status": "error",
            "code": "rateLimited",
            "message": "You have made too many requests recently."
        })))
        .unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { .. }));
    }
}

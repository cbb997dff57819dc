//! Configuration for company research operations

use crate::error::{ResearchError, Result};
use crate::retry::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_NEWS_API_BASE_URL: &str = "https://newsapi.org";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-1106-preview";

/// Configuration for the research aggregator and its provider clients
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Alpha Vantage API key
    pub alpha_vantage_api_key: Option<String>,

    /// NewsAPI key
    pub news_api_key: Option<String>,

    /// OpenAI (or compatible) API key
    pub openai_api_key: Option<String>,

    pub alpha_vantage_base_url: String,
    pub news_api_base_url: String,
    pub openai_api_base: String,

    /// Chat model used for the narrative
    pub openai_model: String,

    /// Budget for the whole market-data adapter call
    pub market_timeout: Duration,

    /// Budget for the news adapter call
    pub news_timeout: Duration,

    /// Budget for the narrative adapter call
    pub narrative_timeout: Duration,

    /// Per-HTTP-request timeout for the market and news clients
    pub request_timeout: Duration,

    /// Attempts per adapter call (1 = no retry)
    pub max_attempts: u32,

    /// Initial backoff between attempts
    pub retry_backoff_base: Duration,

    /// Alpha Vantage requests per minute (free tier: 5)
    pub alpha_vantage_rate_limit: u32,

    /// Articles requested from NewsAPI
    pub news_page_size: u32,
    pub news_language: String,
    pub news_sort_by: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_api_key: None,
            news_api_key: None,
            openai_api_key: None,
            alpha_vantage_base_url: DEFAULT_ALPHA_VANTAGE_BASE_URL.to_string(),
            news_api_base_url: DEFAULT_NEWS_API_BASE_URL.to_string(),
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            market_timeout: Duration::from_secs(60),
            news_timeout: Duration::from_secs(30),
            narrative_timeout: Duration::from_secs(180),
            request_timeout: Duration::from_secs(30),
            max_attempts: 1,
            retry_backoff_base: Duration::from_millis(500),
            alpha_vantage_rate_limit: 5,
            news_page_size: 5,
            news_language: "en".to_string(),
            news_sort_by: "publishedAt".to_string(),
        }
    }
}

impl ResearchConfig {
    /// Create a new configuration builder
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unset keys keep their defaults; malformed numbers are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(key) = get("ALPHA_VANTAGE_API_KEY") {
            builder = builder.alpha_vantage_api_key(key);
        }
        if let Some(key) = get("NEWS_API_KEY") {
            builder = builder.news_api_key(key);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            builder = builder.openai_api_key(key);
        }
        if let Some(url) = get("ALPHA_VANTAGE_BASE_URL") {
            builder = builder.alpha_vantage_base_url(url);
        }
        if let Some(url) = get("NEWS_API_BASE_URL") {
            builder = builder.news_api_base_url(url);
        }
        if let Some(url) = get("OPENAI_API_BASE") {
            builder = builder.openai_api_base(url);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            builder = builder.openai_model(model);
        }
        if let Some(secs) = get("MARKET_TIMEOUT_SECS") {
            builder = builder
                .market_timeout(Duration::from_secs(parse_var("MARKET_TIMEOUT_SECS", &secs)?));
        }
        if let Some(secs) = get("NEWS_TIMEOUT_SECS") {
            builder = builder
                .news_timeout(Duration::from_secs(parse_var("NEWS_TIMEOUT_SECS", &secs)?));
        }
        if let Some(secs) = get("NARRATIVE_TIMEOUT_SECS") {
            let secs = parse_var("NARRATIVE_TIMEOUT_SECS", &secs)?;
            builder = builder.narrative_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            builder = builder
                .request_timeout(Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", &secs)?));
        }
        if let Some(n) = get("PROVIDER_MAX_ATTEMPTS") {
            builder = builder.max_attempts(parse_var("PROVIDER_MAX_ATTEMPTS", &n)?);
        }
        if let Some(n) = get("ALPHA_VANTAGE_RATE_LIMIT") {
            builder = builder.alpha_vantage_rate_limit(parse_var("ALPHA_VANTAGE_RATE_LIMIT", &n)?);
        }
        if let Some(n) = get("NEWS_PAGE_SIZE") {
            builder = builder.news_page_size(parse_var("NEWS_PAGE_SIZE", &n)?);
        }
        if let Some(language) = get("NEWS_LANGUAGE") {
            builder = builder.news_language(language);
        }
        if let Some(sort_by) = get("NEWS_SORT_BY") {
            builder = builder.news_sort_by(sort_by);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, timeout) in [
            ("market_timeout", self.market_timeout),
            ("news_timeout", self.news_timeout),
            ("narrative_timeout", self.narrative_timeout),
            ("request_timeout", self.request_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ResearchError::Config(format!("{name} must be greater than 0")));
            }
        }

        if self.max_attempts == 0 {
            return Err(ResearchError::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.alpha_vantage_rate_limit == 0 {
            return Err(ResearchError::Config(
                "alpha_vantage_rate_limit must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.news_page_size) {
            return Err(ResearchError::Config(
                "news_page_size must be between 1 and 100".to_string(),
            ));
        }

        for (name, value) in [
            ("alpha_vantage_base_url", &self.alpha_vantage_base_url),
            ("news_api_base_url", &self.news_api_base_url),
            ("openai_api_base", &self.openai_api_base),
        ] {
            Url::parse(value)
                .map_err(|e| ResearchError::Config(format!("{name} is not a valid URL: {e}")))?;
        }

        Ok(())
    }

    /// Retry policy applied to every adapter call
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: self.retry_backoff_base,
            ..RetryPolicy::default()
        }
    }

    /// Return a configured API key or a configuration error naming the variable
    pub fn require_key<'a>(key: &'a Option<String>, var: &str) -> Result<&'a str> {
        key.as_deref()
            .ok_or_else(|| ResearchError::Config(format!("{var} environment variable not set")))
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ResearchError::Config(format!("{key}={value:?}: {e}")))
}

/// Builder for ResearchConfig
#[derive(Debug, Default)]
pub struct ResearchConfigBuilder {
    alpha_vantage_api_key: Option<String>,
    news_api_key: Option<String>,
    openai_api_key: Option<String>,
    alpha_vantage_base_url: Option<String>,
    news_api_base_url: Option<String>,
    openai_api_base: Option<String>,
    openai_model: Option<String>,
    market_timeout: Option<Duration>,
    news_timeout: Option<Duration>,
    narrative_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    max_attempts: Option<u32>,
    retry_backoff_base: Option<Duration>,
    alpha_vantage_rate_limit: Option<u32>,
    news_page_size: Option<u32>,
    news_language: Option<String>,
    news_sort_by: Option<String>,
}

impl ResearchConfigBuilder {
    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    pub fn news_api_key(mut self, key: impl Into<String>) -> Self {
        self.news_api_key = Some(key.into());
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn alpha_vantage_base_url(mut self, url: impl Into<String>) -> Self {
        self.alpha_vantage_base_url = Some(url.into());
        self
    }

    pub fn news_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.news_api_base_url = Some(url.into());
        self
    }

    pub fn openai_api_base(mut self, url: impl Into<String>) -> Self {
        self.openai_api_base = Some(url.into());
        self
    }

    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    /// Set the market adapter budget
    pub fn market_timeout(mut self, duration: Duration) -> Self {
        self.market_timeout = Some(duration);
        self
    }

    /// Set the news adapter budget
    pub fn news_timeout(mut self, duration: Duration) -> Self {
        self.news_timeout = Some(duration);
        self
    }

    /// Set the narrative adapter budget
    pub fn narrative_timeout(mut self, duration: Duration) -> Self {
        self.narrative_timeout = Some(duration);
        self
    }

    /// Set the per-HTTP-request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set attempts per adapter call
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    pub fn alpha_vantage_rate_limit(mut self, per_minute: u32) -> Self {
        self.alpha_vantage_rate_limit = Some(per_minute);
        self
    }

    pub fn news_page_size(mut self, size: u32) -> Self {
        self.news_page_size = Some(size);
        self
    }

    pub fn news_language(mut self, language: impl Into<String>) -> Self {
        self.news_language = Some(language.into());
        self
    }

    pub fn news_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.news_sort_by = Some(sort_by.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ResearchConfig> {
        let defaults = ResearchConfig::default();

        let config = ResearchConfig {
            alpha_vantage_api_key: self.alpha_vantage_api_key,
            news_api_key: self.news_api_key,
            openai_api_key: self.openai_api_key,
            alpha_vantage_base_url: self
                .alpha_vantage_base_url
                .unwrap_or(defaults.alpha_vantage_base_url),
            news_api_base_url: self.news_api_base_url.unwrap_or(defaults.news_api_base_url),
            openai_api_base: self.openai_api_base.unwrap_or(defaults.openai_api_base),
            openai_model: self.openai_model.unwrap_or(defaults.openai_model),
            market_timeout: self.market_timeout.unwrap_or(defaults.market_timeout),
            news_timeout: self.news_timeout.unwrap_or(defaults.news_timeout),
            narrative_timeout: self.narrative_timeout.unwrap_or(defaults.narrative_timeout),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            alpha_vantage_rate_limit: self
                .alpha_vantage_rate_limit
                .unwrap_or(defaults.alpha_vantage_rate_limit),
            news_page_size: self.news_page_size.unwrap_or(defaults.news_page_size),
            news_language: self.news_language.unwrap_or(defaults.news_language),
            news_sort_by: self.news_sort_by.unwrap_or(defaults.news_sort_by),
        };

        config.validate()?;
        Ok(config)
    }
}

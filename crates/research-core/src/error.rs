//! Error types for company research operations

use crate::model::{ErrorKind, ProviderFailure};
use thiserror::Error;

/// Errors raised by the provider API clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or HTTP transport error, with the request URL stripped
    #[error("Network error: {0}")]
    Http(reqwest::Error),

    /// Provider answered with a non-success status code
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Provider throttled the request
    #[error("Rate limit exceeded for {provider}: {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
    },

    /// Provider reported an error inside a successful response body
    #[error("{provider} error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested entity does not exist at the provider
    #[error("Not found: {0}")]
    NotFound(String),
}

// Request URLs may carry credentials as query parameters
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

impl From<ApiError> for ProviderFailure {
    fn from(err: ApiError) -> Self {
        let kind = match &err {
            ApiError::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            ApiError::Http(e) if e.is_decode() => ErrorKind::MalformedResponse,
            ApiError::Json(_) => ErrorKind::MalformedResponse,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::UpstreamError,
        };
        ProviderFailure::new(kind, err.to_string())
    }
}

/// Request-level errors of the research service
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Company name was empty or otherwise unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Every provider failed; no partial report is produced
    #[error("All providers failed (market: {market}; news: {news}; narrative: {narrative})")]
    AllProvidersFailed {
        market: ProviderFailure,
        news: ProviderFailure,
        narrative: ProviderFailure,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider could not be constructed
    #[error("LLM error: {0}")]
    Llm(#[from] research_llm::LLMError),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ResearchError {
    /// Taxonomy kind for request-level errors, `None` for setup errors
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::InvalidInput(_) => Some(ErrorKind::InvalidInput),
            Self::AllProvidersFailed { .. } => Some(ErrorKind::AllProvidersFailed),
            Self::Config(_) | Self::Llm(_) | Self::HttpClient(_) => None,
        }
    }
}

/// Result type alias for research operations
pub type Result<T> = std::result::Result<T, ResearchError>;

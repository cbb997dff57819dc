//! HTTP error responses

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use research_core::{ErrorKind, ResearchError};
use serde_json::{Value, json};
use tracing::{error, warn};

const INTERNAL_ERROR: &str = "internal_error";

/// Error rendered as `{ "error_kind", "message", "failures"? }`
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub failures: Option<Value>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: ErrorKind::InvalidInput.as_str(),
            message: message.into(),
            failures: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: INTERNAL_ERROR,
            message: message.into(),
            failures: None,
        }
    }
}

impl From<ResearchError> for AppError {
    fn from(err: ResearchError) -> Self {
        match &err {
            ResearchError::InvalidInput(message) => Self::bad_request(message.clone()),
            ResearchError::AllProvidersFailed {
                market,
                news,
                narrative,
            } => Self {
                status: StatusCode::BAD_GATEWAY,
                kind: ErrorKind::AllProvidersFailed.as_str(),
                message: "All data providers failed".to_string(),
                failures: Some(json!({
                    "market": market,
                    "news": news,
                    "narrative": narrative,
                })),
            },
            ResearchError::Config(_) | ResearchError::Llm(_) | ResearchError::HttpClient(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(kind = self.kind, "{}", self.message);
        } else {
            warn!(kind = self.kind, "{}", self.message);
        }

        let mut body = json!({
            "error_kind": self.kind,
            "message": self.message,
        });
        if let Some(failures) = self.failures {
            body["failures"] = failures;
        }

        (self.status, Json(body)).into_response()
    }
}

//! HTTP routes

use crate::error::AppError;
use crate::request_id::{RequestId, request_id_middleware};
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Request, State, rejection::JsonRejection},
    middleware,
    routing::{get, post},
};
use research_core::CompanyReport;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub company_name: String,
}

pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/research", post(analyze))
        .route("/api/analyze", post(analyze))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map_or("-", |id| id.0.as_str());
                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id,
                )
            }),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Liveness only; providers are not contacted
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "API is operational",
        "service": state.app_name,
        "environment": state.environment,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<CompanyReport>, AppError> {
    let Json(request) = payload?;
    info!(company = %request.company_name, "Research requested");

    let report = state.aggregator.analyze(&request.company_name).await?;
    Ok(Json(report))
}

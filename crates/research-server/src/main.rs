//! HTTP server for the company research assistant

mod error;
mod request_id;
mod routes;
mod state;

use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use research_core::{Aggregator, ResearchConfig};
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "research-server")]
#[command(about = "Company research API: market data, news and LLM analysis", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Allowed CORS origins
    #[arg(
        long = "cors-origin",
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_values_t = default_origins()
    )]
    cors_origins: Vec<String>,
}

fn default_origins() -> Vec<String> {
    ["localhost", "127.0.0.1"]
        .iter()
        .flat_map(|host| (3000..=3002).map(move |port| format!("http://{host}:{port}")))
        .collect()
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim())
                .with_context(|| format!("invalid CORS origin '{origin}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
        .max_age(Duration::from_secs(600)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = research_utils::Config::from_env()?;
    research_utils::init_tracing(app_config.log_format);

    let args = Args::parse();

    let research_config = ResearchConfig::from_env()?;
    let aggregator =
        Aggregator::from_config(&research_config).context("failed to configure providers")?;

    info!(
        "Starting {} ({})",
        app_config.app_name, app_config.environment
    );
    let state = Arc::new(AppState {
        aggregator,
        app_name: app_config.app_name,
        environment: app_config.environment,
    });
    let app = routes::router(state, cors_layer(&args.cors_origins)?);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!("Listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

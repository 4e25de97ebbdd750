mod config;
mod errors;
mod extract;
mod letter;
mod llm_client;
mod render;
mod routes;
mod scrape;
mod state;

use std::net::SocketAddr;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::letter::normalizer::LetterNormalizer;
use crate::llm_client::ModelAvailability;
use crate::routes::build_router;
use crate::scrape::JobScraper;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Coverline API v{}", env!("CARGO_PKG_VERSION"));

    // A missing token disables the AI endpoints (503) instead of failing startup.
    let model = ModelAvailability::from_token(config.github_token.clone());
    if model.is_available() {
        info!("Model client initialized (model: {})", llm_client::MODEL);
    } else {
        warn!("No valid GITHUB_TOKEN found; AI endpoints will answer 503");
    }

    let scraper = JobScraper::new()?;

    if !config.static_dir.is_dir() {
        warn!(
            "Static directory {} does not exist; /static will answer 404",
            config.static_dir.display()
        );
    }
    info!("Generated letters go to {}", config.output_dir.display());

    let state = AppState {
        config: config.clone(),
        normalizer: LetterNormalizer::new(model),
        scraper,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

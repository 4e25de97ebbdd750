pub mod health;

use axum::{routing::get, Router};
use serde_json::{Map, Value};
use tower_http::services::ServeDir;

use crate::state::AppState;
use crate::{extract, letter, render, scrape};

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .nest("/api/scraper", scrape::handlers::router())
        .nest("/api/extract", extract::handlers::router())
        .nest("/api/cover", render::handlers::router())
        .nest("/api/ai", letter::handlers::router())
        .nest_service("/static", static_files)
        .with_state(state)
}

/// `{ path: description }` for a sub-service's root listing.
pub fn endpoint_listing(prefix: &str, endpoints: &[(&str, &str)]) -> Map<String, Value> {
    endpoints
        .iter()
        .map(|(path, description)| (format!("{prefix}{path}"), Value::from(*description)))
        .collect()
}

use axum::{extract::State, Json};
use serde_json::{json, Map, Value};

use crate::letter::handlers::ai_service_status;
use crate::routes::endpoint_listing;
use crate::state::AppState;
use crate::{extract, letter, render, scrape};

/// GET /health
/// Liveness plus whether the model-backed endpoints can run.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "ai_service": ai_service_status(&state),
        "message": "Coverline API is running"
    }))
}

/// GET /
/// Service metadata with the endpoint listing of every mounted sub-service.
pub async fn root_handler() -> Json<Value> {
    let services: [(&str, &[(&str, &str)]); 4] = [
        ("/api/scraper", &scrape::handlers::ENDPOINTS),
        ("/api/extract", &extract::handlers::ENDPOINTS),
        ("/api/cover", &render::handlers::ENDPOINTS),
        ("/api/ai", &letter::handlers::ENDPOINTS),
    ];

    let listing: Map<String, Value> = services
        .into_iter()
        .map(|(prefix, endpoints)| {
            (
                prefix.to_string(),
                Value::Object(endpoint_listing(prefix, endpoints)),
            )
        })
        .collect();

    Json(json!({
        "message": "Coverline API",
        "version": env!("CARGO_PKG_VERSION"),
        "services": listing,
        "static": "/static"
    }))
}

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::AppError;
use crate::routes::endpoint_listing;
use crate::scrape::{validate_job_url, ScrapeError};
use crate::state::AppState;

pub const ENDPOINTS: [(&str, &str); 2] = [
    ("/scrape", "POST - Scrape job description from LinkedIn URL (GET ?url= also accepted)"),
    ("/health", "GET - Health check endpoint"),
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/scrape", get(handle_scrape_query).post(handle_scrape))
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// GET /api/scraper/
pub async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "LinkedIn Job Scraper API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoint_listing("", &ENDPOINTS),
    }))
}

/// GET /api/scraper/health
pub async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Job scraper API is running"
    }))
}

/// POST /api/scraper/scrape
pub async fn handle_scrape(
    State(state): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, AppError> {
    scrape(&state, req.url).await
}

/// GET /api/scraper/scrape?url=
pub async fn handle_scrape_query(
    State(state): State<AppState>,
    Query(req): Query<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, AppError> {
    scrape(&state, req.url).await
}

/// A bad URL is the caller's fault (400); anything after that is a `success: false` body.
async fn scrape(state: &AppState, url: String) -> Result<Json<ScrapeResponse>, AppError> {
    validate_job_url(&url)?;

    let response = match state.scraper.scrape(&url).await {
        Ok(job) => ScrapeResponse {
            success: true,
            url: job.url,
            job_description: Some(job.job_description),
            word_count: Some(job.word_count),
            error_message: None,
        },
        Err(e @ ScrapeError::InvalidUrl(_)) => return Err(e.into()),
        Err(e) => {
            warn!(url = %url, "Scrape failed: {e}");
            ScrapeResponse {
                success: false,
                url,
                job_description: None,
                word_count: None,
                error_message: Some(e.to_string()),
            }
        }
    };
    Ok(Json(response))
}

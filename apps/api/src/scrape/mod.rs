// Job Posting Scraper
// Fetches a LinkedIn job page and pulls the description text out of the first
// matching content container.

pub mod handlers;

use std::time::Duration;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use scraper::{Html, Selector};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Only job-view pages from this one provider are accepted.
pub const JOB_URL_MARKER: &str = "linkedin.com/jobs/view/";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Tried in order; the first selector matching any element wins.
const DESCRIPTION_SELECTORS: [&str; 5] = [
    "div.show-more-less-html__markup.relative.overflow-hidden",
    r#"div[class*="show-more-less-html__markup"]"#,
    r#"div[class*="job-description"]"#,
    r#"div[class*="description"]"#,
    ".description__text",
];

static BLANK_LINE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("blank line regex is valid"));
static NEWLINE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("newline regex is valid"));

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL. Please provide a LinkedIn job posting URL (e.g., https://www.linkedin.com/jobs/view/123456789)")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Job description element not found on the page")]
    ContentNotFound,

    #[error("Parsing error: {0}")]
    Parsing(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapedJob {
    pub url: String,
    pub job_description: String,
    pub word_count: usize,
}

#[derive(Clone)]
pub struct JobScraper {
    client: reqwest::Client,
    request_delay: Duration,
}

impl JobScraper {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_delay(REQUEST_DELAY)
    }

    fn with_delay(request_delay: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .build()
            .context("Failed to create scraper HTTP client")?;
        Ok(Self {
            client,
            request_delay,
        })
    }

    /// One delayed GET, then selector-based extraction.
    pub async fn scrape(&self, url: &str) -> Result<ScrapedJob, ScrapeError> {
        validate_job_url(url)?;

        tokio::time::sleep(self.request_delay).await;

        info!(url = %url, "Fetching job posting");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!(url = %url, "Job posting request failed: {e}");
                ScrapeError::Network(e.to_string())
            })?;

        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Parsing(e.to_string()))?;
        debug!(url = %url, bytes = html.len(), "Job posting fetched");

        let job_description = extract_job_description(&html)?;
        Ok(ScrapedJob {
            url: url.to_string(),
            word_count: job_description.split_whitespace().count(),
            job_description,
        })
    }
}

pub fn validate_job_url(url: &str) -> Result<(), ScrapeError> {
    if url.contains(JOB_URL_MARKER) {
        Ok(())
    } else {
        Err(ScrapeError::InvalidUrl(url.to_string()))
    }
}

/// Text nodes of the first matching container, trimmed, newline-joined, with blank-line
/// runs collapsed to a single blank line.
pub fn extract_job_description(html: &str) -> Result<String, ScrapeError> {
    let document = Html::parse_document(html);

    for raw in DESCRIPTION_SELECTORS {
        let selector = Selector::parse(raw).map_err(|e| ScrapeError::Parsing(e.to_string()))?;
        let Some(element) = document.select(&selector).next() else {
            continue;
        };
        debug!(selector = raw, "Job description container matched");

        let text = element
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let text = BLANK_LINE_RUN.replace_all(&text, "\n\n");
        return Ok(NEWLINE_RUN.replace_all(&text, "\n\n").into_owned());
    }

    Err(ScrapeError::ContentNotFound)
}

// Accept-Encoding is left to reqwest, which only advertises what it can decode.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let pairs: [(header::HeaderName, &'static str); 9] = [
        (
            header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
        ),
        (header::ACCEPT_LANGUAGE, "en-US,en;q=0.9"),
        (header::CONNECTION, "keep-alive"),
        (header::UPGRADE_INSECURE_REQUESTS, "1"),
        (header::HeaderName::from_static("sec-fetch-dest"), "document"),
        (header::HeaderName::from_static("sec-fetch-mode"), "navigate"),
        (header::HeaderName::from_static("sec-fetch-site"), "none"),
        (header::HeaderName::from_static("sec-fetch-user"), "?1"),
        (header::CACHE_CONTROL, "max-age=0"),
    ];
    for (name, value) in pairs {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers
}

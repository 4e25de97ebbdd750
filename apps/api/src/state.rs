use crate::config::Config;
use crate::letter::normalizer::LetterNormalizer;
use crate::scrape::JobScraper;

/// Shared application state injected into all route handlers via Axum extractors.
/// Nothing in it is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Built from `ModelAvailability`; reports 503 reasons when no token is configured.
    pub normalizer: LetterNormalizer,
    pub scraper: JobScraper,
}

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Placeholder shipped in `.env.example`; treated the same as an unset token.
const TOKEN_PLACEHOLDER: &str = "your_github_token_here";

/// Application configuration loaded from environment variables.
/// Only malformed values fail startup; a missing model token just disables the AI endpoints.
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub static_dir: PathBuf,
    pub output_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            github_token: optional_env("GITHUB_TOKEN").filter(|t| t != TOKEN_PLACEHOLDER),
            static_dir: optional_env("STATIC_DIR")
                .unwrap_or_else(|| "static".to_string())
                .into(),
            output_dir: optional_env("OUTPUT_DIR")
                .unwrap_or_else(|| ".".to_string())
                .into(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Reads an env var, treating empty and whitespace-only values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

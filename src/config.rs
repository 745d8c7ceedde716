//! # Configuration Management
//!
//! This module handles loading configuration from environment variables.
//! Configuration comes from the environment, with an optional `.env` file
//! for local development.
//!
//! ## Environment Variables
//! - `BASE_API_URL`: Root URL of the identity service (default: http://localhost:8000)
//! - `DATABASE_URL`: SQLite database holding the refresh token
//! - `REQUEST_TIMEOUT_SECS`: Per-request timeout in seconds (default: 30)

use anyhow::{ensure, Context, Result};
use reqwest::Url;
use std::env;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root URL of the identity service
    /// Example: "https://api.example.com"
    pub base_api_url: String,

    /// SQLite database connection URL
    /// Format: "sqlite:filename.db?mode=rwc"
    /// The "mode=rwc" means: read, write, create if not exists
    pub database_url: String,

    /// Timeout applied to every identity service request
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` first if present (dotenvy doesn't error if the file is
    /// missing), then falls back to defaults for unset variables.
    ///
    /// ## Example .env file
    /// ```text
    /// BASE_API_URL=https://api.example.com
    /// DATABASE_URL=sqlite:session.db?mode=rwc
    /// REQUEST_TIMEOUT_SECS=30
    /// ```
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key/value source.
    ///
    /// # Errors
    /// - `BASE_API_URL` is not a valid URL
    /// - `REQUEST_TIMEOUT_SECS` is not a positive integer
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_api_url =
            lookup("BASE_API_URL").unwrap_or_else(|| "http://localhost:8000".to_string());
        Url::parse(&base_api_url)
            .with_context(|| format!("BASE_API_URL is not a valid URL: {}", base_api_url))?;

        let timeout_secs: u64 = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
        ensure!(timeout_secs > 0, "REQUEST_TIMEOUT_SECS must be greater than zero");

        Ok(Config {
            base_api_url,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:session.db?mode=rwc".to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

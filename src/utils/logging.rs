//! Structured logging and credential-safe trace utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing a helper that keeps
//! signed-URL secrets out of log sinks.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::Result;
use reqwest::Url;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Query parameters whose values never reach the logs.
const SENSITIVE_PARAMS: &[&str] = &[
    "token",
    "access_token",
    "key",
    "sig",
    "signature",
    "auth",
    "password",
];

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Renders a URL for logging with credential-looking query values replaced.
///
/// Precached and bulk-cached URLs are often pre-signed CDN links. The value of
/// any parameter named in `SENSITIVE_PARAMS` is swapped for `REDACTED`.
/// Strings that do not parse as URLs are returned unchanged.
pub fn redact_url(input: &str) -> String {
    let Ok(mut url) = Url::parse(input) else {
        return input.to_string();
    };

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !pairs
        .iter()
        .any(|(k, _)| SENSITIVE_PARAMS.contains(&k.to_ascii_lowercase().as_str()))
    {
        return input.to_string();
    }

    url.query_pairs_mut().clear().extend_pairs(pairs.iter().map(|(k, v)| {
        if SENSITIVE_PARAMS.contains(&k.to_ascii_lowercase().as_str()) {
            (k.as_str(), "REDACTED")
        } else {
            (k.as_str(), v.as_str())
        }
    }));

    url.to_string()
}

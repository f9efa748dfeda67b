//! Configuration data structures for the offline-vault proxy.
//!
//! This module defines the schema for the application settings: the HTTP
//! host, the upstream origin being cached, bucket names, precache manifests,
//! the eviction sweep and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, control timeout).
    #[serde(default)]
    pub server: ServerConfig,

    /// The application origin being cached and its cross-origin allow-list.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Names of the storage buckets.
    #[serde(default)]
    pub buckets: BucketsConfig,

    /// Install-time manifests and the offline fallback page.
    #[serde(default)]
    pub precache: PrecacheConfig,

    /// Size-based eviction sweep settings.
    #[serde(default)]
    pub eviction: EvictionConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long the HTTP control endpoint waits for a reply before giving up.
    /// Default: `60`
    #[serde(default = "default_control_timeout")]
    pub control_timeout_seconds: u64,

    /// Largest request body accepted for pass-through and control requests.
    /// Default: `10485760` (10MB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Settings for the upstream application origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Origin of the application whose requests are intercepted.
    /// Default: `http://127.0.0.1:3000`
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Hosts outside the origin that may still be cached (stale-while-revalidate).
    /// An entry also admits its subdomains.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Request timeout in seconds.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Maximum number of idle connections kept per upstream host.
    /// Default: `10`
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,
}

/// Bucket names. Anything not listed here is deleted at activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketsConfig {
    /// Persistent bucket for styles, scripts and fonts.
    #[serde(default = "default_app_bucket")]
    pub app: String,

    /// Persistent bucket for images.
    #[serde(default = "default_assets_bucket")]
    pub assets: String,

    /// Ephemeral bucket for everything else; subject to eviction.
    #[serde(default = "default_runtime_bucket")]
    pub runtime: String,

    /// Manual-page buckets keyed by page id.
    #[serde(default)]
    pub pages: BTreeMap<String, String>,
}

/// Install-time population lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecacheConfig {
    /// URLs stored in the app bucket at install.
    #[serde(default = "default_precache_app")]
    pub app: Vec<String>,

    /// URLs stored in the assets bucket at install.
    #[serde(default)]
    pub assets: Vec<String>,

    /// Page served to navigations when both network and cache miss.
    /// Default: `/offline.html`
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,
}

/// Settings for the background eviction sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Size ceiling per evictable bucket, in bytes.
    /// Default: `52428800` (50MB)
    #[serde(default = "default_max_bucket_bytes")]
    pub max_bucket_bytes: u64,

    /// Seconds between sweeps.
    /// Default: `300`
    #[serde(default = "default_eviction_interval")]
    pub interval_seconds: u64,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            control_timeout_seconds: default_control_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            allowed_origins: default_allowed_origins(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            pool_max_idle_per_host: default_pool_size(),
        }
    }
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            app: default_app_bucket(),
            assets: default_assets_bucket(),
            runtime: default_runtime_bucket(),
            pages: BTreeMap::new(),
        }
    }
}

impl Default for PrecacheConfig {
    fn default() -> Self {
        Self {
            app: default_precache_app(),
            assets: Vec::new(),
            offline_fallback: default_offline_fallback(),
        }
    }
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            max_bucket_bytes: default_max_bucket_bytes(),
            interval_seconds: default_eviction_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_control_timeout() -> u64 {
    60
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_origin() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["fonts.googleapis.com".to_string(), "fonts.gstatic.com".to_string()]
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_pool_size() -> usize {
    10
}

fn default_app_bucket() -> String {
    "vault-app-v1".to_string()
}

fn default_assets_bucket() -> String {
    "vault-assets-v1".to_string()
}

fn default_runtime_bucket() -> String {
    "vault-runtime-v1".to_string()
}

fn default_precache_app() -> Vec<String> {
    vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/offline.html".to_string(),
        "/manifest.json".to_string(),
    ]
}

fn default_offline_fallback() -> String {
    "/offline.html".to_string()
}

fn default_max_bucket_bytes() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_eviction_interval() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

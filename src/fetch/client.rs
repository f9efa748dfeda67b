// HTTP fetcher backed by reqwest
// Author: kelexine (https://github.com/kelexine)

use super::{FetchRequest, Fetcher};
use crate::config::UpstreamConfig;
use crate::error::{Result, VaultError};
use crate::storage::{is_hop_by_hop, CachedResponse};
use crate::utils::logging::redact_url;
use async_trait::async_trait;
use axum::http::header;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches requests from the real network.
///
/// Uses a pooled client with keep-alive. Bodies are read in full so they can
/// be stored and cloned cheaply.
pub struct HttpFetcher {
    http_client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| VaultError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created HTTP client with connection pooling and keep-alive");

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse> {
        let target = redact_url(request.url.as_str());
        debug!("Fetching {} {}", request.method, target);

        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in request.headers.iter() {
            if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
                continue;
            }
            builder = builder.header(name.clone(), value.clone());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VaultError::Network(format!("{}: {}", target, e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| VaultError::Network(format!("Failed to read body of {}: {}", target, e)))?;

        debug!("Fetched {} -> HTTP {} ({} bytes)", target, status.as_u16(), body.len());

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}

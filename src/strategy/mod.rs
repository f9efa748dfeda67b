//! Fetch/store strategies.
//!
//! Three policies decide how an intercepted request is answered:
//!
//! - **cache-first**: serve any stored copy; otherwise fetch and store.
//! - **network-first**: fetch and store; fall back to a stored copy, then to
//!   the offline page for navigations.
//! - **stale-while-revalidate**: serve any stored copy immediately while a
//!   detached task refreshes the runtime bucket.
//!
//! Lookups search every bucket. Writes are best-effort: a failed write is
//! logged and the response is still returned.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod range;

use crate::error::{Result, VaultError};
use crate::fetch::{Destination, FetchRequest, Fetcher};
use crate::metrics;
use crate::storage::{CacheStorage, CachedResponse, Entry};
use crate::utils::logging::redact_url;
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies strategies against shared storage and a shared fetcher.
#[derive(Clone)]
pub struct StrategyEngine {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    runtime_bucket: String,
    /// Absolute key of the page served to offline navigations.
    offline_fallback_key: String,
}

impl StrategyEngine {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        runtime_bucket: String,
        offline_fallback_key: String,
    ) -> Self {
        Self {
            storage,
            fetcher,
            runtime_bucket,
            offline_fallback_key,
        }
    }

    /// Serve a stored copy if any bucket has one, else fetch and store into `bucket`.
    pub async fn cache_first(&self, request: &FetchRequest, bucket: &str) -> Result<CachedResponse> {
        let key = request.cache_key();

        if let Some(entry) = self.lookup(&key).await {
            debug!("Cache hit for {}", redact_url(&key));
            return Ok(self.serve_cached(request, entry));
        }

        match self.network(request).await {
            Ok(response) => {
                if response.is_storable() {
                    self.store(bucket, &key, response.clone()).await;
                }
                Ok(response)
            }
            Err(e) if request.destination == Destination::Image => {
                debug!("Image fetch failed, serving placeholder: {}", e);
                Ok(CachedResponse::not_found_placeholder())
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch and store into the runtime bucket; fall back to any stored copy,
    /// then to the offline page for navigations.
    pub async fn network_first(&self, request: &FetchRequest) -> Result<CachedResponse> {
        let key = request.cache_key();

        let error = match self.network(request).await {
            Ok(response) => {
                if response.is_storable() {
                    self.store(&self.runtime_bucket, &key, response.clone()).await;
                }
                return Ok(response);
            }
            Err(e) => e,
        };

        if let Some(entry) = self.lookup(&key).await {
            debug!("Network failed, serving cached {}", redact_url(&key));
            return Ok(entry.response);
        }

        if request.is_navigation() {
            if let Some(fallback) = self.lookup(&self.offline_fallback_key).await {
                debug!("Network failed, serving offline fallback for {}", redact_url(&key));
                return Ok(fallback.response);
            }
            warn!("Offline fallback {} is not cached", self.offline_fallback_key);
        }

        Err(error)
    }

    /// Serve a stored copy immediately and refresh it in the background.
    ///
    /// Without a stored copy the call waits for the network. The refreshed
    /// value is only visible to later calls.
    pub async fn stale_while_revalidate(&self, request: &FetchRequest) -> Result<CachedResponse> {
        let key = request.cache_key();
        let cached = self.lookup(&key).await;

        let this = self.clone();
        let revalidate_request = request.clone();
        let had_cached = cached.is_some();
        let revalidation = tokio::spawn(async move {
            let result = this.network(&revalidate_request).await;
            match &result {
                Ok(response) if response.is_storable() => {
                    let key = revalidate_request.cache_key();
                    this.store(&this.runtime_bucket, &key, response.clone()).await;
                }
                Ok(_) => {}
                Err(e) if had_cached => {
                    debug!("Background revalidation failed: {}", e);
                }
                Err(_) => {}
            }
            result
        });

        if let Some(entry) = cached {
            return Ok(entry.response);
        }

        revalidation
            .await
            .map_err(|e| VaultError::Internal(format!("Revalidation task failed: {}", e)))?
    }

    fn serve_cached(&self, request: &FetchRequest, entry: Entry) -> CachedResponse {
        match request.range() {
            Some(header) if range::is_media(request, &entry.response) => {
                range::partial_response(&entry.response, header)
            }
            _ => entry.response,
        }
    }

    /// Lookup across all buckets. Storage errors count as a miss.
    async fn lookup(&self, key: &str) -> Option<Entry> {
        match self.storage.match_any(key).await {
            Ok(Some(entry)) => {
                metrics::record_cache_lookup(true);
                Some(entry)
            }
            Ok(None) => {
                metrics::record_cache_lookup(false);
                None
            }
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", redact_url(key), e);
                metrics::record_cache_lookup(false);
                None
            }
        }
    }

    async fn store(&self, bucket: &str, key: &str, response: CachedResponse) {
        if let Err(e) = self.storage.put(bucket, key, response).await {
            warn!("Failed to store {} in {}: {}", redact_url(key), bucket, e);
        }
    }

    async fn network(&self, request: &FetchRequest) -> Result<CachedResponse> {
        let result = self.fetcher.fetch(request).await;
        metrics::record_network_fetch(&result);
        result
    }
}

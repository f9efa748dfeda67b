// Engine facade wiring routing, strategies, control and lifecycle
// Author: kelexine (https://github.com/kelexine)

use crate::config::AppConfig;
use crate::control::ControlHandler;
use crate::error::{Result, VaultError};
use crate::fetch::{resolve_url, FetchRequest, Fetcher};
use crate::lifecycle::LifecycleManager;
use crate::metrics;
use crate::router::{RequestRouter, Route};
use crate::storage::{BucketRegistry, CacheStorage, CachedResponse};
use crate::strategy::StrategyEngine;
use crate::utils::logging::redact_url;
use reqwest::Url;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Result of intercepting one request.
#[derive(Debug)]
pub enum Intercept {
    /// Not handled by the engine; the host forwards the request itself.
    Passthrough,
    Response(CachedResponse),
}

/// Everything needed to answer intercepted requests and control messages.
#[derive(Clone)]
pub struct CacheEngine {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<BucketRegistry>,
    router: RequestRouter,
    strategies: StrategyEngine,
    control: ControlHandler,
    lifecycle: LifecycleManager,
}

impl CacheEngine {
    pub fn new(
        config: &AppConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let origin = Url::parse(&config.upstream.origin).map_err(|e| {
            VaultError::Config(format!("invalid upstream.origin '{}': {}", config.upstream.origin, e))
        })?;
        let offline_fallback = resolve_url(&origin, &config.precache.offline_fallback)
            .map_err(|e| VaultError::Config(format!("invalid precache.offline_fallback: {}", e)))?;

        let registry = Arc::new(BucketRegistry::new(&config.buckets));
        let router = RequestRouter::new(origin.clone(), &config.upstream.allowed_origins);
        let strategies = StrategyEngine::new(
            storage.clone(),
            fetcher.clone(),
            registry.runtime().to_string(),
            crate::fetch::cache_key(&offline_fallback),
        );
        let control = ControlHandler::new(
            storage.clone(),
            fetcher.clone(),
            registry.clone(),
            origin.clone(),
        );
        let lifecycle = LifecycleManager::new(
            storage.clone(),
            fetcher.clone(),
            registry.clone(),
            config.precache.clone(),
            origin,
            config.eviction.max_bucket_bytes,
        );

        Ok(Self {
            storage,
            fetcher,
            registry,
            router,
            strategies,
            control,
            lifecycle,
        })
    }

    /// Classify and answer one request. Everything passes through until the
    /// lifecycle has activated.
    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<Intercept> {
        if !self.lifecycle.is_active() {
            return Ok(Intercept::Passthrough);
        }

        let route = self.router.classify(&request);
        debug!("{} {} -> {}", request.method, redact_url(request.url.as_str()), route.label());

        let start = Instant::now();
        let result = match route {
            Route::Passthrough => return Ok(Intercept::Passthrough),
            Route::NetworkFirst => self.strategies.network_first(&request).await,
            Route::StaleWhileRevalidate => self.strategies.stale_while_revalidate(&request).await,
            Route::CacheFirst(kind) => {
                let bucket = self
                    .registry
                    .name_for(kind)
                    .unwrap_or_else(|| self.registry.runtime());
                debug!("cache-first into {} bucket {}", kind.as_str(), bucket);
                self.strategies.cache_first(&request, bucket).await
            }
        };

        metrics::record_intercept(route.label(), result.is_ok(), start.elapsed().as_secs_f64());
        result.map(Intercept::Response)
    }

    pub fn control_handler(&self) -> &ControlHandler {
        &self.control
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }
}

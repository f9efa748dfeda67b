//! Install, activation and background eviction.
//!
//! The lifecycle mirrors a worker that is installed, then activated, then
//! left running:
//!
//! 1. **Install** pre-populates the persistent buckets from configured
//!    manifests. It is best-effort: a failing url is logged and skipped.
//! 2. **Activate** deletes every bucket the current configuration does not
//!    recognize, then starts interception.
//! 3. **Evict** trims each ephemeral or manual-page bucket that has grown
//!    past the ceiling by removing the oldest half of its entries.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::PrecacheConfig;
use crate::control::{fetch_into, FailedUrl};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::metrics;
use crate::storage::{BucketRegistry, CacheStorage};
use crate::utils::logging::redact_url;
use futures::future::join_all;
use reqwest::Url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outcome of an install pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<FailedUrl>,
}

/// One bucket trimmed by an eviction sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionReport {
    pub bucket: String,
    pub size_before: u64,
    pub removed: usize,
}

#[derive(Clone)]
pub struct LifecycleManager {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<BucketRegistry>,
    precache: PrecacheConfig,
    origin: Url,
    max_bucket_bytes: u64,
    active: Arc<AtomicBool>,
}

impl LifecycleManager {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        registry: Arc<BucketRegistry>,
        precache: PrecacheConfig,
        origin: Url,
        max_bucket_bytes: u64,
    ) -> Self {
        Self {
            storage,
            fetcher,
            registry,
            precache,
            origin,
            max_bucket_bytes,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether activation has completed and requests are being intercepted.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Populate the app and asset buckets from the precache manifests.
    pub async fn install(&self) -> InstallReport {
        info!(
            "Installing: {} app url(s), {} asset url(s)",
            self.precache.app.len(),
            self.precache.assets.len()
        );

        let jobs = self
            .precache
            .app
            .iter()
            .map(|url| (self.registry.app(), url))
            .chain(
                self.precache
                    .assets
                    .iter()
                    .map(|url| (self.registry.assets(), url)),
            );

        let outcomes = join_all(jobs.map(|(bucket, url)| async move {
            let outcome = fetch_into(
                self.storage.as_ref(),
                self.fetcher.as_ref(),
                &self.origin,
                bucket,
                url,
            )
            .await;
            (url.clone(), outcome)
        }))
        .await;

        let mut report = InstallReport::default();
        for (url, outcome) in outcomes {
            match outcome {
                Ok(()) => report.cached.push(url),
                Err(e) => {
                    warn!("Precache skipped {}: {}", redact_url(&url), e);
                    report.failed.push(FailedUrl {
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Install finished: {} cached, {} skipped",
            report.cached.len(),
            report.failed.len()
        );
        report
    }

    /// Delete unrecognized buckets and start intercepting. Returns the deleted names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.storage.bucket_names().await? {
            if self.registry.is_recognized(&name) {
                continue;
            }
            if self.storage.delete_bucket(&name).await? {
                info!("Deleted stale bucket {}", name);
                metrics::update_bucket_size(&name, 0);
                deleted.push(name);
            }
        }

        self.active.store(true, Ordering::Release);
        info!("Activated; {} stale bucket(s) removed", deleted.len());
        Ok(deleted)
    }

    /// One eviction sweep over every evictable bucket.
    pub async fn evict(&self) -> Vec<EvictionReport> {
        let mut reports = Vec::new();
        for bucket in self.registry.evictable_names() {
            match self.evict_bucket(bucket).await {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => error!("Eviction of {} failed: {}", bucket, e),
            }
        }
        reports
    }

    async fn evict_bucket(&self, bucket: &str) -> Result<Option<EvictionReport>> {
        let entries = self.storage.entries(bucket).await?;
        let size_before: u64 = entries.iter().map(|e| e.size).sum();
        metrics::update_bucket_size(bucket, size_before);

        if size_before <= self.max_bucket_bytes {
            return Ok(None);
        }

        let victims = entries.len() / 2;
        let mut removed = 0;
        let mut freed = 0;
        for entry in entries.iter().take(victims) {
            if self.storage.remove(bucket, &entry.key).await? {
                removed += 1;
                freed += entry.size;
            }
        }

        metrics::record_eviction(bucket, removed);
        metrics::update_bucket_size(bucket, size_before.saturating_sub(freed));
        info!(
            "Evicted {} of {} entries from {} ({} bytes over ceiling)",
            removed,
            entries.len(),
            bucket,
            size_before - self.max_bucket_bytes
        );

        Ok(Some(EvictionReport {
            bucket: bucket.to_string(),
            size_before,
            removed,
        }))
    }

    /// Run [`evict`](Self::evict) every `period` until the task is aborted.
    pub fn spawn_eviction(&self, period: Duration) -> JoinHandle<()> {
        let me = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let reports = me.evict().await;
                debug!("Eviction sweep trimmed {} bucket(s)", reports.len());
            }
        })
    }
}

// Control message handling
// Author: kelexine (https://github.com/kelexine)

use super::messages::{BucketInfo, ControlMessage, ControlResult, FailedUrl, UNKNOWN_PAGE_ID};
use crate::error::{Result, VaultError};
use crate::fetch::{resolve_url, FetchRequest, Fetcher};
use crate::metrics;
use crate::storage::{BucketRegistry, CacheStorage};
use crate::utils::logging::redact_url;
use futures::future::join_all;
use reqwest::Url;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Executes control messages against storage. Every call produces exactly one
/// `ControlResult`; failures are folded into `{success: false, error}`.
#[derive(Clone)]
pub struct ControlHandler {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<BucketRegistry>,
    origin: Url,
}

impl ControlHandler {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        registry: Arc<BucketRegistry>,
        origin: Url,
    ) -> Self {
        Self {
            storage,
            fetcher,
            registry,
            origin,
        }
    }

    /// Validate and execute a raw JSON message.
    pub async fn handle_value(&self, value: Value) -> ControlResult {
        match ControlMessage::from_value(value) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                warn!("Rejected control message: {}", e);
                metrics::record_control_message("INVALID", false);
                ControlResult::failure(e.to_string())
            }
        }
    }

    pub async fn handle(&self, message: ControlMessage) -> ControlResult {
        let kind = message.kind();
        debug!("Handling control message {}", kind);

        let result = match message {
            ControlMessage::BulkCache { urls } => {
                let bucket = self.registry.runtime().to_string();
                self.populate(&bucket, urls).await
            }
            ControlMessage::PageCache { page_id, urls } => match self.registry.page_bucket(&page_id) {
                Some(bucket) => {
                    let bucket = bucket.to_string();
                    self.populate(&bucket, urls).await
                }
                None => {
                    warn!("PAGE_CACHE for unknown page id '{}'", page_id);
                    ControlResult::failure(UNKNOWN_PAGE_ID)
                }
            },
            ControlMessage::Info => self.inventory().await,
            ControlMessage::Clear { bucket_name } => self.clear(bucket_name).await,
        };

        metrics::record_control_message(kind, result.success);
        result
    }

    /// Fetch every url concurrently into `bucket`. Outcomes keep input order.
    async fn populate(&self, bucket: &str, urls: Vec<String>) -> ControlResult {
        if let Err(e) = self.storage.open(bucket).await {
            return ControlResult::failure(e.to_string());
        }

        let outcomes = join_all(urls.into_iter().map(|url| async move {
            let outcome = self.cache_one(bucket, &url).await;
            (url, outcome)
        }))
        .await;

        let mut cached = Vec::new();
        let mut failed = Vec::new();
        for (url, outcome) in outcomes {
            match outcome {
                Ok(()) => cached.push(url),
                Err(e) => {
                    debug!("Failed to cache {}: {}", redact_url(&url), e);
                    failed.push(FailedUrl {
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Populated {}: {} cached, {} failed",
            bucket,
            cached.len(),
            failed.len()
        );
        ControlResult::populate(cached, failed)
    }

    async fn cache_one(&self, bucket: &str, raw_url: &str) -> Result<()> {
        fetch_into(
            self.storage.as_ref(),
            self.fetcher.as_ref(),
            &self.origin,
            bucket,
            raw_url,
        )
        .await
    }

    async fn inventory(&self) -> ControlResult {
        match self.collect_inventory().await {
            Ok(info) => ControlResult::inventory(info),
            Err(e) => {
                warn!("INFO failed: {}", e);
                ControlResult::failure(e.to_string())
            }
        }
    }

    async fn collect_inventory(&self) -> Result<BTreeMap<String, BucketInfo>> {
        let mut info = BTreeMap::new();
        for name in self.storage.bucket_names().await? {
            let entries = self.storage.entries(&name).await?;
            let estimated_size = entries.iter().map(|e| e.size).sum();
            metrics::update_bucket_size(&name, estimated_size);
            info.insert(
                name,
                BucketInfo {
                    entries: entries.len(),
                    estimated_size,
                },
            );
        }
        Ok(info)
    }

    async fn clear(&self, bucket_name: Option<String>) -> ControlResult {
        let targets = match bucket_name {
            Some(name) => vec![name],
            None => match self.storage.bucket_names().await {
                Ok(names) => names,
                Err(e) => return ControlResult::failure(e.to_string()),
            },
        };

        for name in &targets {
            if let Err(e) = self.storage.delete_bucket(name).await {
                warn!("CLEAR failed on {}: {}", name, e);
                return ControlResult::failure(e.to_string());
            }
            metrics::update_bucket_size(name, 0);
        }

        info!("Cleared {} bucket(s)", targets.len());
        ControlResult::cleared(targets)
    }
}

/// Fetch one url (relative urls resolve against `origin`) and store it in
/// `bucket`. Non-2xx and partial responses are not stored and surface as
/// `Http(status)`.
pub(crate) async fn fetch_into(
    storage: &dyn CacheStorage,
    fetcher: &dyn Fetcher,
    origin: &Url,
    bucket: &str,
    raw_url: &str,
) -> Result<()> {
    let request = FetchRequest::get(resolve_url(origin, raw_url)?);

    let fetched = fetcher.fetch(&request).await;
    metrics::record_network_fetch(&fetched);
    let response = fetched?;

    if !response.is_storable() {
        return Err(VaultError::Http(response.status.as_u16()));
    }
    storage.put(bucket, &request.cache_key(), response).await
}

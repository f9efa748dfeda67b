// In-memory bucket storage
// Author: kelexine (https://github.com/kelexine)

use super::{CacheStorage, CachedResponse, Entry};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    created: u64,
    entries: HashMap<String, Entry>,
}

/// Process-local storage. Locks are held only for the map operation itself,
/// never across an await point.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    buckets: RwLock<HashMap<String, Bucket>>,
    bucket_seq: AtomicU64,
    entry_seq: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_bucket(&self) -> Bucket {
        Bucket {
            created: self.bucket_seq.fetch_add(1, Ordering::Relaxed),
            entries: HashMap::new(),
        }
    }
}

#[async_trait]
impl CacheStorage for InMemoryStorage {
    async fn open(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.buckets.write();
        if !buckets.contains_key(bucket) {
            debug!("Creating bucket {}", bucket);
            let created = self.new_bucket();
            buckets.insert(bucket.to_string(), created);
        }
        Ok(())
    }

    async fn bucket_names(&self) -> Result<Vec<String>> {
        let buckets = self.buckets.read();
        let mut names: Vec<(u64, String)> = buckets
            .iter()
            .map(|(name, b)| (b.created, name.clone()))
            .collect();
        names.sort_unstable();
        Ok(names.into_iter().map(|(_, name)| name).collect())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.write().remove(bucket).is_some())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Entry>> {
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .and_then(|b| b.entries.get(key))
            .cloned())
    }

    async fn put(&self, bucket: &str, key: &str, response: CachedResponse) -> Result<()> {
        let mut buckets = self.buckets.write();
        let target = buckets
            .entry(bucket.to_string())
            .or_insert_with(|| self.new_bucket());

        // Overwrites keep their original position in the FIFO order
        let insertion_order = match target.entries.get(key) {
            Some(existing) => existing.insertion_order,
            None => self.entry_seq.fetch_add(1, Ordering::Relaxed),
        };
        target
            .entries
            .insert(key.to_string(), Entry::new(key.to_string(), response, insertion_order));
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .buckets
            .write()
            .get_mut(bucket)
            .map(|b| b.entries.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<Entry>> {
        let buckets = self.buckets.read();
        let mut entries: Vec<Entry> = buckets
            .get(bucket)
            .map(|b| b.entries.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by_key(|e| e.insertion_order);
        Ok(entries)
    }
}

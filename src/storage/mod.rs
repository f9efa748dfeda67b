//! Bucketed cache storage.
//!
//! The engine never talks to a concrete cache backend directly. Everything
//! goes through [`CacheStorage`], an async interface over named buckets of
//! keyed entries. [`InMemoryStorage`] is the backend used by the proxy and
//! by the tests.
//!
//! # Submodules
//!
//! - `bucket`: Bucket kinds and the registry of recognized names.
//! - `entry`: Cached responses and entry metadata.
//! - `memory`: The in-process storage backend.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod bucket;
mod entry;
mod memory;

pub use bucket::{BucketKind, BucketRegistry};
pub use entry::{is_hop_by_hop, CachedResponse, Entry};
pub use memory::InMemoryStorage;

use crate::error::Result;
use async_trait::async_trait;

/// Async storage over named buckets.
///
/// Writes are keyed overwrites: a second `put` for the same key replaces the
/// payload in place. Implementations must report entries in insertion order.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the bucket if it does not exist yet.
    async fn open(&self, bucket: &str) -> Result<()>;

    /// Existing bucket names, in creation order.
    async fn bucket_names(&self) -> Result<Vec<String>>;

    /// Delete a bucket and all of its entries. Returns whether it existed.
    async fn delete_bucket(&self, bucket: &str) -> Result<bool>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Entry>>;

    /// Store a payload, creating the bucket lazily.
    async fn put(&self, bucket: &str, key: &str, response: CachedResponse) -> Result<()>;

    async fn remove(&self, bucket: &str, key: &str) -> Result<bool>;

    /// All entries of a bucket ordered by insertion. Missing buckets yield an empty list.
    async fn entries(&self, bucket: &str) -> Result<Vec<Entry>>;

    /// First match for `key` across every bucket, in bucket creation order.
    async fn match_any(&self, key: &str) -> Result<Option<Entry>> {
        for name in self.bucket_names().await? {
            if let Some(entry) = self.get(&name, key).await? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

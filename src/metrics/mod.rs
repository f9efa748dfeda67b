// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    INTERCEPTED_REQUESTS,
    INTERCEPT_DURATION,
    CACHE_LOOKUPS,
    EVICTED_ENTRIES,
    BUCKET_SIZE,
    NETWORK_FETCHES,
    CONTROL_MESSAGES,
};

use crate::error::Result;
use crate::storage::CachedResponse;

/// Helper to record an intercepted request
pub fn record_intercept(route: &str, ok: bool, duration_secs: f64) {
    let outcome = if ok { "ok" } else { "error" };
    INTERCEPTED_REQUESTS.with_label_values(&[route, outcome]).inc();
    INTERCEPT_DURATION
        .with_label_values(&[route])
        .observe(duration_secs);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS.with_label_values(&[result]).inc();
}

/// Helper to record the outcome of an upstream fetch
pub fn record_network_fetch(result: &Result<CachedResponse>) {
    let outcome = match result {
        Ok(response) if response.is_success() => "ok",
        Ok(_) => "http_error",
        Err(_) => "failed",
    };
    NETWORK_FETCHES.with_label_values(&[outcome]).inc();
}

pub fn record_control_message(kind: &str, success: bool) {
    CONTROL_MESSAGES
        .with_label_values(&[kind, if success { "true" } else { "false" }])
        .inc();
}

pub fn record_eviction(bucket: &str, removed: usize) {
    if removed > 0 {
        EVICTED_ENTRIES
            .with_label_values(&[bucket])
            .inc_by(removed as f64);
    }
}

pub fn update_bucket_size(bucket: &str, bytes: u64) {
    BUCKET_SIZE.with_label_values(&[bucket]).set(bytes as f64);
}

// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // INTERCEPTION METRICS
    // ============================================================================

    /// Intercepted requests by route and outcome
    pub static ref INTERCEPTED_REQUESTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("intercepted_requests_total", "Total intercepted requests"),
        &["route", "outcome"], // outcome: ok, error
        REGISTRY
    ).unwrap();

    /// Time spent answering an intercepted request
    pub static ref INTERCEPT_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("intercept_duration_seconds", "Intercept duration in seconds")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["route"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Lookups across all buckets
    pub static ref CACHE_LOOKUPS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_lookups_total", "Total cache lookups"),
        &["result"], // result: hit, miss
        REGISTRY
    ).unwrap();

    /// Entries removed by periodic eviction
    pub static ref EVICTED_ENTRIES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("evicted_entries_total", "Total entries removed by eviction"),
        &["bucket"],
        REGISTRY
    ).unwrap();

    /// Estimated bucket size as last measured
    pub static ref BUCKET_SIZE: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("bucket_size_bytes", "Estimated bucket size in bytes"),
        &["bucket"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // NETWORK METRICS
    // ============================================================================

    /// Upstream fetches
    pub static ref NETWORK_FETCHES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("network_fetches_total", "Total upstream fetches"),
        &["outcome"], // outcome: ok, http_error, failed
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CONTROL METRICS
    // ============================================================================

    /// Control messages handled
    pub static ref CONTROL_MESSAGES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("control_messages_total", "Total control messages handled"),
        &["type", "success"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# failed to encode metrics: {}\n", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

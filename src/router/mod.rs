// Request classification
// Author: kelexine (https://github.com/kelexine)

use crate::fetch::{Destination, FetchRequest};
use crate::storage::BucketKind;
use axum::http::Method;
use reqwest::Url;

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the host forwards it untouched.
    Passthrough,
    NetworkFirst,
    CacheFirst(BucketKind),
    StaleWhileRevalidate,
}

impl Route {
    /// Metric label for this route.
    pub fn label(&self) -> &'static str {
        match self {
            Route::Passthrough => "passthrough",
            Route::NetworkFirst => "network_first",
            Route::CacheFirst(_) => "cache_first",
            Route::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

/// Ordered rule table mapping requests to strategies. First match wins.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    origin: Url,
    allowed_hosts: Vec<String>,
}

impl RequestRouter {
    pub fn new(origin: Url, allowed_origins: &[String]) -> Self {
        let allowed_hosts = allowed_origins
            .iter()
            .map(|o| normalize_allowed(o))
            .filter(|h| !h.is_empty())
            .collect();
        Self {
            origin,
            allowed_hosts,
        }
    }

    pub fn classify(&self, request: &FetchRequest) -> Route {
        if request.method != Method::GET {
            return Route::Passthrough;
        }

        let cross_origin = self.is_cross_origin(&request.url);
        if cross_origin && !self.is_allowed(&request.url) {
            return Route::Passthrough;
        }

        if request.is_navigation() {
            return Route::NetworkFirst;
        }

        match request.destination {
            Destination::Style | Destination::Script | Destination::Font => {
                Route::CacheFirst(BucketKind::PersistentApp)
            }
            Destination::Image => Route::CacheFirst(BucketKind::PersistentAsset),
            _ if cross_origin => Route::StaleWhileRevalidate,
            _ => Route::CacheFirst(BucketKind::EphemeralRuntime),
        }
    }

    pub fn is_cross_origin(&self, url: &Url) -> bool {
        url.origin() != self.origin.origin()
    }

    /// Allow-list match on host: exact, or any subdomain of an entry.
    fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Accept either bare hosts (`cdn.example.com`) or origins (`https://cdn.example.com`).
fn normalize_allowed(entry: &str) -> String {
    let entry = entry.trim();
    Url::parse(entry)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| entry.trim_end_matches('/').to_ascii_lowercase())
}

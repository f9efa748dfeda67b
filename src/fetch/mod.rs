// Request descriptors and the network fetcher seam
// Author: kelexine (https://github.com/kelexine)

mod client;

pub use client::HttpFetcher;

use crate::error::{Result, VaultError};
use crate::storage::CachedResponse;
use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use reqwest::Url;

/// What the requester intends to do with the response (`Sec-Fetch-Dest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Style,
    Script,
    Font,
    Image,
    Audio,
    Video,
    Manifest,
    Worker,
    Empty,
    Other,
}

impl Destination {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Destination::Document,
            "style" => Destination::Style,
            "script" => Destination::Script,
            "font" => Destination::Font,
            "image" => Destination::Image,
            "audio" => Destination::Audio,
            "video" | "track" => Destination::Video,
            "manifest" => Destination::Manifest,
            "worker" | "sharedworker" | "serviceworker" => Destination::Worker,
            "" | "empty" => Destination::Empty,
            _ => Destination::Other,
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, Destination::Audio | Destination::Video)
    }
}

/// Request mode (`Sec-Fetch-Mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
    WebSocket,
}

impl RequestMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "navigate" => RequestMode::Navigate,
            "same-origin" => RequestMode::SameOrigin,
            "no-cors" => RequestMode::NoCors,
            "websocket" => RequestMode::WebSocket,
            _ => RequestMode::Cors,
        }
    }
}

/// A request crossing the interception boundary.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl FetchRequest {
    /// Plain GET with no destination, as issued by control-protocol populates.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Parse `url` and build a GET for it.
    pub fn get_str(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| VaultError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self::get(url))
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Normalized identity used as the entry key.
    pub fn cache_key(&self) -> String {
        cache_key(&self.url)
    }

    pub fn range(&self) -> Option<&str> {
        self.headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Entry key for a URL: the absolute form without its fragment.
pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Resolve a possibly relative URL against the application origin.
pub fn resolve_url(base: &Url, raw: &str) -> Result<Url> {
    base.join(raw)
        .map_err(|e| VaultError::InvalidUrl(format!("{}: {}", raw, e)))
}

/// Network seam. Any HTTP status is `Ok`; only a rejected fetch is `Err(Network)`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_parsing() {
        assert_eq!(Destination::parse("style"), Destination::Style);
        assert_eq!(Destination::parse("IMAGE"), Destination::Image);
        assert_eq!(Destination::parse(""), Destination::Empty);
        assert_eq!(Destination::parse("track"), Destination::Video);
        assert_eq!(Destination::parse("xslt"), Destination::Other);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(RequestMode::parse("navigate"), RequestMode::Navigate);
        assert_eq!(RequestMode::parse("no-cors"), RequestMode::NoCors);
        assert_eq!(RequestMode::parse("anything"), RequestMode::Cors);
    }

    #[test]
    fn test_cache_key_strips_fragment() {
        let url = Url::parse("https://app.test/page.html?v=2#section").unwrap();
        assert_eq!(cache_key(&url), "https://app.test/page.html?v=2");
    }

    #[test]
    fn test_resolve_relative_url() {
        let base = Url::parse("https://app.test").unwrap();
        assert_eq!(
            resolve_url(&base, "/css/site.css").unwrap().as_str(),
            "https://app.test/css/site.css"
        );
        assert_eq!(
            resolve_url(&base, "https://cdn.test/lib.js").unwrap().as_str(),
            "https://cdn.test/lib.js"
        );
    }
}

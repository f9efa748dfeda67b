// Cached payloads and bucket entries
// Author: kelexine (https://github.com/kelexine)

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

/// A stored (or freshly fetched) response. Cloning shares the body bytes.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Builder-style header insertion. Invalid header values are dropped.
    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Empty 404 returned for images that could not be fetched.
    pub fn not_found_placeholder() -> Self {
        Self::new(StatusCode::NOT_FOUND, Bytes::new())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 2xx responses may be stored, except partial content.
    pub fn is_storable(&self) -> bool {
        self.is_success() && self.status != StatusCode::PARTIAL_CONTENT
    }

    /// `Content-Length` as declared by the origin, if any.
    pub fn declared_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Declared length if present, else the measured body length.
    pub fn estimated_size(&self) -> u64 {
        self.declared_length()
            .unwrap_or(self.body.len() as u64)
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        // A bodiless reply (HEAD) keeps the upstream length; otherwise hyper
        // recomputes framing for the body we actually send
        let keep_length = self.body.is_empty()
            && self.status != StatusCode::NO_CONTENT
            && self.status != StatusCode::NOT_MODIFIED;
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers.iter() {
            if is_hop_by_hop(name) || (name == header::CONTENT_LENGTH && !keep_length) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        response
    }
}

/// Connection-scoped headers that must not be replayed from a stored response.
pub fn is_hop_by_hop(name: &header::HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "host"
    )
}

/// One keyed payload inside a bucket.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Normalized request identity (absolute URL without fragment).
    pub key: String,
    pub response: CachedResponse,
    /// Estimated size at insertion (declared length or measured body).
    pub size: u64,
    pub content_type: Option<String>,
    /// Storage-wide insertion sequence, used for FIFO eviction.
    pub insertion_order: u64,
}

impl Entry {
    pub fn new(key: String, response: CachedResponse, insertion_order: u64) -> Self {
        Self {
            size: response.estimated_size(),
            content_type: response.content_type().map(str::to_string),
            key,
            response,
            insertion_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodiless_reply_keeps_declared_length() {
        let head = CachedResponse::new(StatusCode::OK, "")
            .with_header(header::CONTENT_LENGTH, "1234")
            .into_response();
        assert_eq!(head.headers()[header::CONTENT_LENGTH], "1234");

        let sliced = CachedResponse::new(StatusCode::OK, "abc")
            .with_header(header::CONTENT_LENGTH, "1234")
            .into_response();
        assert!(sliced.headers().get(header::CONTENT_LENGTH).is_none());

        let not_modified = CachedResponse::new(StatusCode::NOT_MODIFIED, "")
            .with_header(header::CONTENT_LENGTH, "1234")
            .into_response();
        assert!(not_modified.headers().get(header::CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_estimated_size_prefers_declared_length() {
        let response = CachedResponse::new(StatusCode::OK, "abc")
            .with_header(header::CONTENT_LENGTH, "1024");
        assert_eq!(response.estimated_size(), 1024);

        let measured = CachedResponse::new(StatusCode::OK, "abcdef");
        assert_eq!(measured.estimated_size(), 6);
    }

    #[test]
    fn test_partial_content_is_not_storable() {
        assert!(CachedResponse::new(StatusCode::OK, "a").is_storable());
        assert!(!CachedResponse::new(StatusCode::PARTIAL_CONTENT, "a").is_storable());
        assert!(!CachedResponse::new(StatusCode::NOT_FOUND, "a").is_storable());
    }

    #[test]
    fn test_unparseable_length_falls_back_to_body() {
        let response = CachedResponse::new(StatusCode::OK, "abcd")
            .with_header(header::CONTENT_LENGTH, "lots");
        assert_eq!(response.estimated_size(), 4);
    }

    #[test]
    fn test_entry_captures_metadata() {
        let response = CachedResponse::new(StatusCode::OK, "body")
            .with_header(header::CONTENT_TYPE, "text/css");
        let entry = Entry::new("https://app.test/a.css".to_string(), response, 7);
        assert_eq!(entry.size, 4);
        assert_eq!(entry.content_type.as_deref(), Some("text/css"));
        assert_eq!(entry.insertion_order, 7);
    }

    #[test]
    fn test_into_response_drops_hop_by_hop_headers() {
        let response = CachedResponse::new(StatusCode::OK, "x")
            .with_header(header::TRANSFER_ENCODING, "chunked")
            .with_header(header::CONTENT_TYPE, "text/plain")
            .into_response();
        assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }
}

// Byte-range responses for cached media
// Author: kelexine (https://github.com/kelexine)

use crate::fetch::FetchRequest;
use crate::storage::CachedResponse;
use axum::http::{header, StatusCode};

/// A parsed `Range: bytes=...` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=start-` or `bytes=start-end`
    From { start: u64, end: Option<u64> },
    /// `bytes=-len`
    Suffix(u64),
}

impl ByteRange {
    /// Parse the first range of a `bytes=` header. Multi-range requests use the first range only.
    pub fn parse(header: &str) -> Option<Self> {
        let spec = header.trim().strip_prefix("bytes=")?;
        let first = spec.split(',').next()?.trim();
        let (start, end) = first.split_once('-')?;
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            return end.parse().ok().map(ByteRange::Suffix);
        }

        let start = start.parse().ok()?;
        let end = if end.is_empty() {
            None
        } else {
            Some(end.parse().ok()?)
        };
        Some(ByteRange::From { start, end })
    }

    /// Inclusive `(start, end)` within a payload of `total` bytes, or `None` if unsatisfiable.
    pub fn resolve(&self, total: u64) -> Option<(u64, u64)> {
        if total == 0 {
            return None;
        }
        match *self {
            ByteRange::From { start, end } => {
                let end = end.unwrap_or(total - 1).min(total - 1);
                (start <= end).then_some((start, end))
            }
            ByteRange::Suffix(0) => None,
            ByteRange::Suffix(len) => Some((total.saturating_sub(len), total - 1)),
        }
    }
}

/// Whether a cached entry should be served in slices when a range is requested.
pub fn is_media(request: &FetchRequest, cached: &CachedResponse) -> bool {
    if request.destination.is_media() {
        return true;
    }
    if cached
        .content_type()
        .is_some_and(|ct| ct.starts_with("video/") || ct.starts_with("audio/"))
    {
        return true;
    }
    let path = request.url.path();
    path.ends_with(".mp4") || path.ends_with(".webm")
}

/// Slice a cached payload for a `Range` header.
///
/// Produces `206 Partial Content` with `Content-Range: bytes {start}-{end}/{total}`,
/// or `416` when the range falls outside the payload. A header that is not a
/// byte range at all returns the full response unchanged.
pub fn partial_response(cached: &CachedResponse, range_header: &str) -> CachedResponse {
    let Some(range) = ByteRange::parse(range_header) else {
        return cached.clone();
    };

    let total = cached.body.len() as u64;
    let content_type = cached.content_type().map(str::to_string);

    match range.resolve(total) {
        Some((start, end)) => {
            let slice = cached.body.slice(start as usize..=end as usize);
            let mut response = CachedResponse::new(StatusCode::PARTIAL_CONTENT, slice)
                .with_header(header::CONTENT_RANGE, &format!("bytes {}-{}/{}", start, end, total))
                .with_header(header::CONTENT_LENGTH, &(end - start + 1).to_string())
                .with_header(header::ACCEPT_RANGES, "bytes");
            if let Some(ct) = content_type {
                response = response.with_header(header::CONTENT_TYPE, &ct);
            }
            response
        }
        None => CachedResponse::new(StatusCode::RANGE_NOT_SATISFIABLE, bytes::Bytes::new())
            .with_header(header::CONTENT_RANGE, &format!("bytes */{}", total)),
    }
}

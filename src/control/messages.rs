// Control protocol message and reply types
// Author: kelexine (https://github.com/kelexine)

use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const URLS_NOT_ARRAY: &str = "URLs must be an array";
pub const UNKNOWN_PAGE_ID: &str = "Unknown page ID";

/// A validated control message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Populate the runtime bucket with `urls`.
    BulkCache { urls: Vec<String> },
    /// Populate the manual bucket registered for `page_id`.
    PageCache {
        #[serde(rename = "pageId")]
        page_id: String,
        urls: Vec<String>,
    },
    /// Inventory of every bucket.
    Info,
    /// Delete one bucket, or all of them.
    Clear {
        #[serde(rename = "bucketName", skip_serializing_if = "Option::is_none")]
        bucket_name: Option<String>,
    },
}

/// Wire shape before validation. Fields are loose so malformed payloads
/// produce protocol replies instead of deserialization errors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    urls: Option<Value>,
    page_id: Option<Value>,
    #[serde(alias = "cacheName")]
    bucket_name: Option<String>,
}

impl ControlMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::BulkCache { .. } => "BULK_CACHE",
            ControlMessage::PageCache { .. } => "PAGE_CACHE",
            ControlMessage::Info => "INFO",
            ControlMessage::Clear { .. } => "CLEAR",
        }
    }

    /// Validate a raw JSON message.
    ///
    /// Legacy names (`CACHE_URLS`, `CACHE_PAGE`, `GET_CACHE_INFO`,
    /// `CLEAR_CACHE`) are accepted. A missing or non-string `pageId` becomes an
    /// empty id, which no page bucket matches.
    pub fn from_value(value: Value) -> Result<Self> {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| VaultError::Protocol(format!("Malformed control message: {}", e)))?;

        let kind = envelope
            .kind
            .ok_or_else(|| VaultError::Protocol("Missing message type".to_string()))?;

        match kind.as_str() {
            "BULK_CACHE" | "CACHE_URLS" => Ok(ControlMessage::BulkCache {
                urls: url_list(envelope.urls)?,
            }),
            "PAGE_CACHE" | "CACHE_PAGE" => Ok(ControlMessage::PageCache {
                urls: url_list(envelope.urls)?,
                page_id: envelope
                    .page_id
                    .as_ref()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            "INFO" | "GET_CACHE_INFO" => Ok(ControlMessage::Info),
            "CLEAR" | "CLEAR_CACHE" => Ok(ControlMessage::Clear {
                bucket_name: envelope.bucket_name.filter(|n| !n.is_empty()),
            }),
            other => Err(VaultError::Protocol(format!("Unknown message type: {}", other))),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn url_list(urls: Option<Value>) -> Result<Vec<String>> {
    let Some(Value::Array(items)) = urls else {
        return Err(VaultError::Protocol(URLS_NOT_ARRAY.to_string()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(url) => Ok(url),
            _ => Err(VaultError::Protocol(format!("{} of strings", URLS_NOT_ARRAY))),
        })
        .collect()
}

/// A url that could not be cached, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUrl {
    pub url: String,
    pub reason: String,
}

/// Per-bucket inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub entries: usize,
    pub estimated_size: u64,
}

/// The single reply to a control message. Only the fields relevant to the
/// message type are present on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<Vec<FailedUrl>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_info: Option<BTreeMap<String, BucketInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleared: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Populate outcome. Succeeds unless every url failed; an empty request
    /// has no failures and succeeds.
    pub fn populate(cached: Vec<String>, failed: Vec<FailedUrl>) -> Self {
        let total = cached.len() + failed.len();
        let success = failed.is_empty() || failed.len() < total;
        Self {
            success,
            cached: Some(cached),
            failed: Some(failed),
            ..Default::default()
        }
    }

    pub fn inventory(cache_info: BTreeMap<String, BucketInfo>) -> Self {
        Self {
            success: true,
            cache_info: Some(cache_info),
            ..Default::default()
        }
    }

    pub fn cleared(names: Vec<String>) -> Self {
        Self {
            success: true,
            cleared: Some(names),
            ..Default::default()
        }
    }
}

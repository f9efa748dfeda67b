// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::control::ControlResult;
use crate::engine::Intercept;
use crate::error::{Result, VaultError};
use crate::fetch::{resolve_url, Destination, FetchRequest, RequestMode};
use crate::metrics::{self, gather_metrics};
use crate::storage::is_hop_by_hop;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    // Lifecycle state
    let lifecycle_check = if state.engine.lifecycle().is_active() {
        HealthCheck {
            status: "ok".to_string(),
            message: "Active, intercepting requests".to_string(),
        }
    } else {
        overall_status = HealthStatus::Degraded;
        HealthCheck {
            status: "warning".to_string(),
            message: "Not activated, passing requests through".to_string(),
        }
    };
    checks.insert("lifecycle".to_string(), lifecycle_check);

    // Storage reachability
    let storage_check = match state.engine.storage().bucket_names().await {
        Ok(names) => HealthCheck {
            status: "ok".to_string(),
            message: format!("{} bucket(s)", names.len()),
        },
        Err(e) => {
            overall_status = HealthStatus::Unhealthy;
            HealthCheck {
                status: "error".to_string(),
                message: e.to_string(),
            }
        }
    };
    checks.insert("storage".to_string(), storage_check);

    checks.insert(
        "configuration".to_string(),
        HealthCheck {
            status: "ok".to_string(),
            message: format!("Origin: {}", state.config.upstream.origin),
        },
    );

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Prometheus text exposition
pub async fn metrics_handler() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
        .into_response()
}

/// Handler for /__vault/control. Protocol failures still answer 200 with
/// `{success: false}`; only transport problems become HTTP errors.
pub async fn control_handler(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Control body is not JSON: {}", e);
            metrics::record_control_message("INVALID", false);
            let reply = ControlResult::failure(format!("Malformed control message: {}", e));
            return Ok(Json(reply).into_response());
        }
    };

    let timeout = Duration::from_secs(state.config.server.control_timeout_seconds);
    let result = state.control.call_with_timeout(message, timeout).await?;
    Ok(Json(result).into_response())
}

/// Fallback handler: every application request enters the engine here.
pub async fn intercept_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let limit = state.config.server.max_body_bytes;
    let (parts, body) = request.into_parts();

    let url = request_url(&parts.uri, &state.config.upstream.origin)?;
    let body = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| VaultError::Protocol(format!("Failed to read request body: {}", e)))?;

    let mut fetch = FetchRequest::get(url).with_method(parts.method.clone());
    fetch.destination = header_str(&parts.headers, "sec-fetch-dest")
        .map(Destination::parse)
        .unwrap_or(Destination::Empty);
    fetch.mode = header_str(&parts.headers, "sec-fetch-mode")
        .map(RequestMode::parse)
        .unwrap_or(RequestMode::NoCors);
    fetch.headers = forwardable_headers(&parts.headers);
    if !body.is_empty() {
        fetch = fetch.with_body(body);
    }

    let intercepted = state.engine.handle_fetch(fetch.clone()).await.map_err(|e| {
        if e.is_upstream() {
            debug!("Upstream unavailable for {}: {}", fetch.url, e);
        } else {
            warn!("Intercept failed for {}: {}", fetch.url, e);
        }
        e
    })?;

    match intercepted {
        Intercept::Response(response) => Ok(response.into_response()),
        Intercept::Passthrough => {
            debug!("Forwarding {} {} untouched", fetch.method, fetch.url);
            let response = state.engine.fetcher().fetch(&fetch).await.map_err(|e| {
                warn!("Pass-through fetch failed: {}", e);
                e
            })?;
            Ok(response.into_response())
        }
    }
}

/// Absolute-form URIs (proxy requests) are used as-is; origin-form paths are
/// joined to the configured origin.
fn request_url(uri: &Uri, origin: &str) -> Result<Url> {
    if uri.scheme().is_some() {
        return Url::parse(&uri.to_string())
            .map_err(|e| VaultError::InvalidUrl(format!("{}: {}", uri, e)));
    }
    let origin = Url::parse(origin).map_err(|e| VaultError::Config(e.to_string()))?;
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    resolve_url(&origin, path)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers.iter() {
        if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

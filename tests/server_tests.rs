// HTTP host tests driven through the axum router
// Author: kelexine (https://github.com/kelexine)

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{active_harness, harness_with, test_config, url, Harness};
use offline_vault::control::ControlHandle;
use offline_vault::server::create_router;
use offline_vault::storage::CacheStorage;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    let (control, _task) = ControlHandle::spawn(h.engine.control_handler().clone(), 8);
    create_router(test_config(), h.engine.clone(), control).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_lifecycle() {
    let h = harness_with(&test_config());
    let response = app(&h)
        .oneshot(Request::get("/__vault/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let health = body_json(response).await;
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["checks"]["lifecycle"]["status"], "warning");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let h = active_harness().await;
    let response = app(&h)
        .oneshot(Request::get("/__vault/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn test_control_endpoint_round_trip() {
    let h = active_harness().await;
    h.fetcher.ok(&url("/a"), "a", "text/plain");

    let request = Request::post("/__vault/control")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"type": "BULK_CACHE", "urls": ["/a", "/b"]}).to_string()))
        .unwrap();
    let response = app(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["cached"], json!(["/a"]));
    assert_eq!(result["failed"][0]["url"], "/b");
}

#[tokio::test]
async fn test_control_endpoint_rejects_garbage_with_reply() {
    let h = active_harness().await;
    let request = Request::post("/__vault/control")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().contains("Malformed"));
}

#[tokio::test]
async fn test_intercepted_style_is_cached() {
    let h = active_harness().await;
    let css = url("/site.css");
    h.fetcher.ok(&css, "body{}", "text/css");
    let router = app(&h);

    for _ in 0..2 {
        let request = Request::get("/site.css")
            .header("sec-fetch-dest", "style")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"body{}");
    }

    assert_eq!(h.fetcher.calls(&css), 1);
    assert!(h.storage.get("test-app", &css).await.unwrap().is_some());
}

#[tokio::test]
async fn test_post_is_forwarded_without_caching() {
    let h = active_harness().await;
    let api = url("/api/save");
    h.fetcher.ok(&api, "saved", "text/plain");

    let request = Request::post("/api/save").body(Body::from("payload")).unwrap();
    let response = app(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.fetcher.calls(&api), 1);
    assert!(h.storage.match_any(&api).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unrecoverable_failure_is_bad_gateway() {
    let h = active_harness().await;
    let request = Request::get("/app.js")
        .header("sec-fetch-dest", "script")
        .body(Body::empty())
        .unwrap();
    let response = app(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let error = body_json(response).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["error"]["type"], "network_error");
}

#[tokio::test]
async fn test_offline_navigation_over_http() {
    let h = active_harness().await;
    h.fetcher.ok(&url("/offline.html"), "offline page", "text/html");
    h.engine.lifecycle().install().await;

    let request = Request::get("/somewhere")
        .header("sec-fetch-mode", "navigate")
        .header("sec-fetch-dest", "document")
        .body(Body::empty())
        .unwrap();
    let response = app(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"offline page");
}
